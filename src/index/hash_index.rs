//! Hash index: O(1) exact-match lookup by field value.

use std::collections::HashMap;

use crate::error::TonlResult;
use crate::index::{check_field_name, IndexKey, IndexKind, IndexStats};
use crate::query::{ConcretePath, QueryMatch};

/// Maps a field's value to the concrete paths of every element carrying it.
/// Built once (via [`HashIndex::build`]) from a set of element-level query
/// matches, e.g. the result of evaluating `$.users[*]`. Rebuilt whenever the
/// underlying collection mutates — the index holds no reference back to the
/// document, so there is nothing to invalidate beyond "call `build` again".
#[derive(Debug, Clone, Default)]
pub struct HashIndex {
    field: String,
    buckets: HashMap<IndexKey, Vec<ConcretePath>>,
}

impl HashIndex {
    pub fn build(elements: &[QueryMatch], field: &str) -> TonlResult<Self> {
        check_field_name(field)?;
        let mut buckets: HashMap<IndexKey, Vec<ConcretePath>> = HashMap::new();
        for m in elements {
            let Some(obj) = m.value.as_obj() else {
                continue;
            };
            let Some(field_value) = obj.get(field) else {
                continue;
            };
            if let Some(key) = IndexKey::from_value(field_value) {
                buckets.entry(key).or_default().push(m.path.clone());
            }
        }
        Ok(HashIndex {
            field: field.to_string(),
            buckets,
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn find(&self, key: &IndexKey) -> &[ConcretePath] {
        self.buckets.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn keys(&self) -> impl Iterator<Item = &IndexKey> {
        self.buckets.keys()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            kind: IndexKind::Hash,
            entry_count: self.buckets.values().map(Vec::len).sum(),
            unique_keys: self.buckets.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::Limits;
    use crate::parser::{decode, DecodeOptions};
    use crate::path::parse_path;
    use crate::query::evaluate;

    fn sample_matches() -> Vec<QueryMatch> {
        let text = "users[3]{name,age,role}:\n  Alice,30,admin\n  Bob,25,user\n  Carol,35,moderator\n";
        let root = decode(text, &DecodeOptions::default(), &Limits::default()).unwrap();
        let path = parse_path("$.users[*]").unwrap();
        evaluate(&root, &path, &Limits::default()).unwrap()
    }

    #[test]
    fn exact_match_on_role_finds_one_entry() {
        let index = HashIndex::build(&sample_matches(), "role").unwrap();
        let hits = index.find(&IndexKey::Str("admin".to_string()));
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn missing_key_returns_empty_slice() {
        let index = HashIndex::build(&sample_matches(), "role").unwrap();
        assert!(index.find(&IndexKey::Str("superadmin".to_string())).is_empty());
    }

    #[test]
    fn dangerous_field_name_is_rejected() {
        assert!(HashIndex::build(&sample_matches(), "__proto__").is_err());
    }

    #[test]
    fn stats_report_unique_key_count() {
        let index = HashIndex::build(&sample_matches(), "age").unwrap();
        assert_eq!(index.stats().unique_keys, 3);
    }
}
