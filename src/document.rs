//! Document façade (§3 "Document", §6 public API surface).
//!
//! Ties together the parser, encoder, query evaluator, mutation engine,
//! index layer and schema validator around a single owned [`Value`] tree.
//! A `Document` is the thing a host actually holds: it carries the
//! monotonic version counter the query cache keys on, the cache itself,
//! and whatever secondary indices have been attached. Callers who only
//! need one-shot encode/decode can skip this and use [`crate::encoder`] /
//! [`crate::parser`] directly.

use std::collections::HashMap;

use crate::aggregate;
pub use crate::aggregate::{GroupEntry, Stats};
use crate::encoder::{encode as encode_value, encode_smart as encode_value_smart, EncodeOptions};
use crate::error::{QueryError, TonlResult, TypeError};
use crate::index::{HashIndex, IndexKey, IndexKind, IndexStats, OrderedIndex};
use crate::limits::Limits;
use crate::mutate::{self, DiffEntry, Snapshot};
use crate::parser::{decode, DecodeOptions};
use crate::path::{parse_path, Path, Segment};
use crate::query::{evaluate, CacheStats, ConcretePath, QueryCache, QueryMatch};
use crate::schema::{validate as validate_schema, Schema, ValidationResult};
use crate::value::{TypeHint, Value};

/// Options accepted by [`Document::create_index`].
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexOptions {
    pub unique: bool,
    pub case_insensitive: bool,
}

enum IndexBody {
    Hash(HashIndex),
    Ordered(OrderedIndex),
}

struct IndexEntry {
    /// The path the index was built from, e.g. `$.users[*].id`.
    source_path: String,
    /// `source_path` with its trailing field segment removed, e.g.
    /// `$.users[*]` — what gets re-evaluated to rebuild the index.
    container: Path,
    field: String,
    options: IndexOptions,
    kind: IndexKind,
    body: IndexBody,
    /// Set by any mutation; the index is rebuilt lazily the next time it's
    /// queried (§4.8 "rebuild-on-mutation").
    stale: bool,
}

/// A parsed value tree plus the mutable state (version, cache, indices)
/// the rest of the engine is built around.
pub struct Document {
    root: Value,
    version: u64,
    limits: Limits,
    cache: QueryCache,
    indices: HashMap<String, IndexEntry>,
}

impl Document {
    pub fn from_value(root: Value) -> Self {
        Document {
            root,
            version: 0,
            limits: Limits::default(),
            cache: QueryCache::new(),
            indices: HashMap::new(),
        }
    }

    pub fn from_value_with_limits(root: Value, limits: Limits) -> Self {
        Document {
            root,
            version: 0,
            limits,
            cache: QueryCache::new(),
            indices: HashMap::new(),
        }
    }

    pub fn parse(text: &str) -> TonlResult<Self> {
        Self::parse_with(text, &DecodeOptions::default(), Limits::default())
    }

    pub fn parse_with(text: &str, options: &DecodeOptions, limits: Limits) -> TonlResult<Self> {
        let root = decode(text, options, &limits)?;
        Ok(Document {
            root,
            version: 0,
            limits,
            cache: QueryCache::new(),
            indices: HashMap::new(),
        })
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn to_value(&self) -> Value {
        self.root.clone()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn encode(&self, options: &EncodeOptions) -> TonlResult<String> {
        encode_value(&self.root, options)
    }

    pub fn encode_smart(&self, options: &EncodeOptions) -> TonlResult<String> {
        encode_value_smart(&self.root, options)
    }

    fn bump_version(&mut self) {
        self.version += 1;
        for entry in self.indices.values_mut() {
            entry.stale = true;
        }
    }

    // -- Query -----------------------------------------------------------

    fn query_matches(&mut self, path_expr: &str) -> TonlResult<Vec<QueryMatch>> {
        if let Some(hit) = self.cache.get(path_expr, self.version) {
            return Ok(hit);
        }
        let ast = parse_path(path_expr)?;
        let matches = evaluate(&self.root, &ast, &self.limits)?;
        self.cache.put(path_expr, self.version, matches.clone());
        Ok(matches)
    }

    pub fn query(&mut self, path_expr: &str) -> TonlResult<Vec<QueryMatch>> {
        self.query_matches(path_expr)
    }

    pub fn get(&mut self, path_expr: &str) -> TonlResult<Option<Value>> {
        Ok(self
            .query_matches(path_expr)?
            .into_iter()
            .next()
            .map(|m| m.value))
    }

    pub fn exists(&mut self, path_expr: &str) -> TonlResult<bool> {
        Ok(!self.query_matches(path_expr)?.is_empty())
    }

    pub fn type_of(&mut self, path_expr: &str) -> TonlResult<Option<TypeHint>> {
        Ok(self
            .query_matches(path_expr)?
            .first()
            .map(|m| m.value.infer_hint()))
    }

    /// Length of the array at `path`, or the number of matches for any
    /// other path shape (§8 property 7).
    pub fn count(&mut self, path_expr: &str) -> TonlResult<usize> {
        let matches = self.query_matches(path_expr)?;
        if matches.len() == 1 {
            if let Some(items) = matches[0].value.as_list() {
                return Ok(items.len());
            }
        }
        Ok(matches.len())
    }

    // -- Mutation ----------------------------------------------------------

    pub fn set(&mut self, path_expr: &str, value: Value, create_path: bool) -> TonlResult<()> {
        let ast = parse_path(path_expr)?;
        mutate::set(&mut self.root, &ast, value, create_path)?;
        self.bump_version();
        Ok(())
    }

    pub fn delete(&mut self, path_expr: &str) -> TonlResult<()> {
        let ast = parse_path(path_expr)?;
        mutate::delete(&mut self.root, &ast)?;
        self.bump_version();
        Ok(())
    }

    pub fn push(&mut self, path_expr: &str, value: Value) -> TonlResult<()> {
        let ast = parse_path(path_expr)?;
        mutate::push(&mut self.root, &ast, value)?;
        self.bump_version();
        Ok(())
    }

    pub fn pop(&mut self, path_expr: &str) -> TonlResult<Value> {
        let ast = parse_path(path_expr)?;
        let v = mutate::pop(&mut self.root, &ast)?;
        self.bump_version();
        Ok(v)
    }

    pub fn merge(&mut self, path_expr: &str, patch: crate::value::Obj) -> TonlResult<()> {
        let ast = parse_path(path_expr)?;
        mutate::merge(&mut self.root, &ast, patch)?;
        self.bump_version();
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.root)
    }

    pub fn diff(&self, snapshot: &Snapshot) -> Vec<DiffEntry> {
        mutate::diff(snapshot, &self.root)
    }

    pub fn restore(&mut self, snapshot: &Snapshot) {
        self.root = mutate::restore(snapshot);
        self.bump_version();
    }

    // -- Indices -----------------------------------------------------------

    /// Split `$.users[*].id` into the container path `$.users[*]` and the
    /// trailing field name `id`: the shape every index source path must
    /// take (§4.8 — the wildcarded path "yields many values", one per
    /// element, by naming the field on the element the index keys on).
    fn container_and_field(source_path: &str) -> TonlResult<(Path, String)> {
        let ast = parse_path(source_path)?;
        let mut segments = ast.segments;
        let field = match segments.pop() {
            Some(Segment::Field(name)) => name,
            _ => {
                return Err(QueryError::InvalidPath {
                    expression: source_path.to_string(),
                    reason: "index source path must end in a field segment".to_string(),
                }
                .into())
            }
        };
        Ok((Path { segments }, field))
    }

    fn build_index_body(
        &self,
        container: &Path,
        field: &str,
        kind: IndexKind,
        options: IndexOptions,
    ) -> TonlResult<IndexBody> {
        let elements = evaluate(&self.root, container, &self.limits)?;
        let elements = if options.case_insensitive {
            lowercase_field(&elements, field)
        } else {
            elements
        };
        let body = match kind {
            IndexKind::Hash => IndexBody::Hash(HashIndex::build(&elements, field)?),
            IndexKind::Ordered => IndexBody::Ordered(OrderedIndex::build(&elements, field)?),
        };
        if options.unique {
            let unique_keys = match &body {
                IndexBody::Hash(h) => h.stats().unique_keys == h.stats().entry_count,
                IndexBody::Ordered(o) => o.stats().unique_keys == o.stats().entry_count,
            };
            if !unique_keys {
                return Err(TypeError::ConstraintViolation {
                    message: format!("index on '{field}' requires unique values"),
                }
                .into());
            }
        }
        Ok(body)
    }

    pub fn create_index(
        &mut self,
        name: &str,
        source_path: &str,
        kind: IndexKind,
        options: IndexOptions,
    ) -> TonlResult<()> {
        let (container, field) = Self::container_and_field(source_path)?;
        let body = self.build_index_body(&container, &field, kind, options)?;
        self.indices.insert(
            name.to_string(),
            IndexEntry {
                source_path: source_path.to_string(),
                container,
                field,
                options,
                kind,
                body,
                stale: false,
            },
        );
        Ok(())
    }

    pub fn drop_index(&mut self, name: &str) {
        self.indices.remove(name);
    }

    pub fn index_source_path(&self, name: &str) -> Option<&str> {
        self.indices.get(name).map(|e| e.source_path.as_str())
    }

    fn rebuild_if_stale(&mut self, name: &str) -> TonlResult<()> {
        let Some(entry) = self.indices.get(name) else {
            return Ok(());
        };
        if !entry.stale {
            return Ok(());
        }
        let (container, field, kind, options) = (
            entry.container.clone(),
            entry.field.clone(),
            entry.kind,
            entry.options,
        );
        let body = self.build_index_body(&container, &field, kind, options)?;
        if let Some(entry) = self.indices.get_mut(name) {
            entry.body = body;
            entry.stale = false;
        }
        Ok(())
    }

    pub fn query_index(&mut self, name: &str, key: &IndexKey) -> TonlResult<Vec<ConcretePath>> {
        self.rebuild_if_stale(name)?;
        let entry = self.indices.get(name).ok_or_else(|| QueryError::InvalidPath {
            expression: name.to_string(),
            reason: "no such index".to_string(),
        })?;
        let key = normalize_key(key, entry.options.case_insensitive);
        Ok(match &entry.body {
            IndexBody::Hash(h) => h.find(&key).to_vec(),
            IndexBody::Ordered(o) => o.find(&key).to_vec(),
        })
    }

    pub fn query_index_range(
        &mut self,
        name: &str,
        lo: Option<&IndexKey>,
        hi: Option<&IndexKey>,
        lo_inclusive: bool,
        hi_inclusive: bool,
    ) -> TonlResult<Vec<ConcretePath>> {
        self.rebuild_if_stale(name)?;
        let entry = self.indices.get(name).ok_or_else(|| QueryError::InvalidPath {
            expression: name.to_string(),
            reason: "no such index".to_string(),
        })?;
        match &entry.body {
            IndexBody::Ordered(o) => Ok(o.range(lo, hi, lo_inclusive, hi_inclusive).into_iter().cloned().collect()),
            IndexBody::Hash(_) => Err(QueryError::InvalidPath {
                expression: name.to_string(),
                reason: "range queries require an Ordered index".to_string(),
            }
            .into()),
        }
    }

    pub fn index_stats(&self, name: &str) -> Option<IndexStats> {
        self.indices.get(name).map(|e| match &e.body {
            IndexBody::Hash(h) => h.stats(),
            IndexBody::Ordered(o) => o.stats(),
        })
    }

    // -- Schema --------------------------------------------------------------

    pub fn validate(&self, schema: &Schema) -> ValidationResult {
        validate_schema(&self.root, schema)
    }

    // -- Aggregation (§4.6.1 of the expanded specification) ----------------
    //
    // Thin delegation to `crate::aggregate`, which operates on a bare match
    // list so it stays testable without a `Document` around it.

    pub fn count_of(&mut self, path_expr: &str) -> TonlResult<usize> {
        Ok(aggregate::count(&self.query_matches(path_expr)?))
    }

    pub fn sum(&mut self, path_expr: &str, field: &str) -> TonlResult<f64> {
        aggregate::sum(&self.query_matches(path_expr)?, field)
    }

    pub fn avg(&mut self, path_expr: &str, field: &str) -> TonlResult<f64> {
        aggregate::avg(&self.query_matches(path_expr)?, field)
    }

    pub fn min(&mut self, path_expr: &str, field: &str) -> TonlResult<Option<f64>> {
        aggregate::min(&self.query_matches(path_expr)?, field)
    }

    pub fn max(&mut self, path_expr: &str, field: &str) -> TonlResult<Option<f64>> {
        aggregate::max(&self.query_matches(path_expr)?, field)
    }

    pub fn stats(&mut self, path_expr: &str, field: &str) -> TonlResult<Stats> {
        aggregate::stats(&self.query_matches(path_expr)?, field)
    }

    pub fn median(&mut self, path_expr: &str, field: &str) -> TonlResult<f64> {
        aggregate::median(&self.query_matches(path_expr)?, field)
    }

    /// `p` in `[0, 100]`, linear interpolation between closest ranks.
    pub fn percentile(&mut self, path_expr: &str, field: &str, p: f64) -> TonlResult<f64> {
        aggregate::percentile(&self.query_matches(path_expr)?, field, p)
    }

    pub fn distinct(&mut self, path_expr: &str, field: &str) -> TonlResult<Vec<Value>> {
        aggregate::distinct(&self.query_matches(path_expr)?, field)
    }

    pub fn frequency(&mut self, path_expr: &str, field: &str) -> TonlResult<Vec<(String, usize)>> {
        aggregate::frequency(&self.query_matches(path_expr)?, field)
    }

    pub fn group_by(&mut self, path_expr: &str, field: &str) -> TonlResult<Vec<GroupEntry>> {
        aggregate::group_by(self.query_matches(path_expr)?, field)
    }

    pub fn order_by(&mut self, path_expr: &str, field: &str, descending: bool) -> TonlResult<Vec<QueryMatch>> {
        aggregate::order_by(self.query_matches(path_expr)?, field, descending)
    }

    pub fn take(&mut self, path_expr: &str, n: usize) -> TonlResult<Vec<QueryMatch>> {
        Ok(aggregate::take(self.query_matches(path_expr)?, n))
    }

    pub fn skip(&mut self, path_expr: &str, n: usize) -> TonlResult<Vec<QueryMatch>> {
        Ok(aggregate::skip(self.query_matches(path_expr)?, n))
    }

    pub fn first(&mut self, path_expr: &str) -> TonlResult<Option<QueryMatch>> {
        Ok(aggregate::first(self.query_matches(path_expr)?))
    }

    pub fn last(&mut self, path_expr: &str) -> TonlResult<Option<QueryMatch>> {
        Ok(aggregate::last(self.query_matches(path_expr)?))
    }

    pub fn filter(
        &mut self,
        path_expr: &str,
        predicate: impl Fn(&Value) -> bool,
    ) -> TonlResult<Vec<QueryMatch>> {
        Ok(aggregate::filter(self.query_matches(path_expr)?, predicate))
    }

    pub fn map<T>(&mut self, path_expr: &str, f: impl Fn(&Value) -> T) -> TonlResult<Vec<T>> {
        Ok(aggregate::map(&self.query_matches(path_expr)?, f))
    }

    pub fn reduce<T>(
        &mut self,
        path_expr: &str,
        init: T,
        f: impl Fn(T, &Value) -> T,
    ) -> TonlResult<T> {
        Ok(aggregate::reduce(self.query_matches(path_expr)?, init, f))
    }
}

fn normalize_key(key: &IndexKey, case_insensitive: bool) -> IndexKey {
    if case_insensitive {
        if let IndexKey::Str(s) = key {
            return IndexKey::Str(s.to_lowercase());
        }
    }
    key.clone()
}

fn lowercase_field(elements: &[QueryMatch], field: &str) -> Vec<QueryMatch> {
    elements
        .iter()
        .map(|m| {
            let mut v = m.value.clone();
            if let Some(obj) = v.as_obj_mut() {
                if let Some(Value::Str(s)) = obj.get_mut(field) {
                    *s = s.to_lowercase();
                }
            }
            QueryMatch {
                path: m.path.clone(),
                value: v,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users_doc() -> Document {
        let text = "users[3]{id,name,age,role}:\n  1,Alice,30,admin\n  2,Bob,25,user\n  3,Carol,35,moderator\n";
        Document::parse(text).unwrap()
    }

    #[test]
    fn hash_index_lookup_s5() {
        let mut doc = users_doc();
        doc.create_index("by_id", "$.users[*].id", IndexKind::Hash, IndexOptions::default())
            .unwrap();
        let hits = doc.query_index("by_id", &IndexKey::Int(2)).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(doc.query_index("by_id", &IndexKey::Int(9999)).unwrap().is_empty());
    }

    #[test]
    fn ordered_index_range_s6() {
        let mut doc = users_doc();
        doc.create_index("by_age", "$.users[*].age", IndexKind::Ordered, IndexOptions::default())
            .unwrap();
        let hits = doc
            .query_index_range("by_age", Some(&IndexKey::Int(25)), Some(&IndexKey::Int(35)), true, true)
            .unwrap();
        assert_eq!(hits.len(), 3);
        let hits = doc
            .query_index_range("by_age", Some(&IndexKey::Int(25)), Some(&IndexKey::Int(30)), true, false)
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn index_reflects_mutation_after_rebuild() {
        let mut doc = users_doc();
        doc.create_index("by_id", "$.users[*].id", IndexKind::Hash, IndexOptions::default())
            .unwrap();
        doc.set("$.users[0].id", Value::Int(99), false).unwrap();
        let hits = doc.query_index("by_id", &IndexKey::Int(99)).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(doc.query_index("by_id", &IndexKey::Int(1)).unwrap().is_empty());
    }

    #[test]
    fn snapshot_diff_restore_s4() {
        let mut doc = users_doc();
        let snap = doc.snapshot();
        doc.set("$.users[0].age", Value::Int(31), false).unwrap();
        let entries = doc.diff(&snap);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "$.users[0].age");
        doc.restore(&snap);
        assert_eq!(doc.get("$.users[0].age").unwrap(), Some(Value::Int(30)));
    }

    #[test]
    fn cache_hits_on_repeated_query() {
        let mut doc = users_doc();
        for _ in 0..100 {
            doc.query("$.users[*].name").unwrap();
        }
        let stats = doc.cache_stats();
        assert!(stats.misses <= 1);
        assert!(stats.hits >= 99);
    }

    #[test]
    fn mutation_invalidates_cache() {
        let mut doc = users_doc();
        doc.query("$.users[*].name").unwrap();
        doc.set("$.users[0].name", Value::Str("Alicia".into()), false).unwrap();
        doc.query("$.users[*].name").unwrap();
        let stats = doc.cache_stats();
        assert_eq!(stats.misses, 2);
    }

    #[test]
    fn group_by_and_aggregate() {
        let mut doc = users_doc();
        let groups = doc.group_by("$.users[*]", "role").unwrap();
        assert_eq!(groups.len(), 3);
        let total_age = doc.sum("$.users[*]", "age").unwrap();
        assert_eq!(total_age, 90.0);
        let avg_age = doc.avg("$.users[*]", "age").unwrap();
        assert!((avg_age - 30.0).abs() < 1e-9);
    }

    #[test]
    fn order_by_and_take() {
        let mut doc = users_doc();
        let ordered = doc.order_by("$.users[*]", "age", false).unwrap();
        assert_eq!(
            ordered[0].value.as_obj().unwrap().get("name").unwrap(),
            &Value::Str("Bob".to_string())
        );
        let top_two = doc.take("$.users[*]", 2).unwrap();
        assert_eq!(top_two.len(), 2);
    }

    #[test]
    fn dangerous_field_rejected_in_aggregation() {
        let mut doc = users_doc();
        assert!(doc.sum("$.users[*]", "__proto__").is_err());
    }
}
