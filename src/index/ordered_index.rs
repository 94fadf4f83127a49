//! Ordered index: O(log N) range queries over a field's value, backed by a
//! sorted `BTreeMap`.

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::error::TonlResult;
use crate::index::{check_field_name, IndexKey, IndexKind, IndexStats};
use crate::query::{ConcretePath, QueryMatch};

#[derive(Debug, Clone, Default)]
pub struct OrderedIndex {
    field: String,
    tree: BTreeMap<IndexKey, Vec<ConcretePath>>,
}

impl OrderedIndex {
    pub fn build(elements: &[QueryMatch], field: &str) -> TonlResult<Self> {
        check_field_name(field)?;
        let mut tree: BTreeMap<IndexKey, Vec<ConcretePath>> = BTreeMap::new();
        for m in elements {
            let Some(obj) = m.value.as_obj() else {
                continue;
            };
            let Some(field_value) = obj.get(field) else {
                continue;
            };
            if let Some(key) = IndexKey::from_value(field_value) {
                tree.entry(key).or_default().push(m.path.clone());
            }
        }
        Ok(OrderedIndex {
            field: field.to_string(),
            tree,
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn find(&self, key: &IndexKey) -> &[ConcretePath] {
        self.tree.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All matches whose key falls within the bounds, each independently
    /// inclusive or exclusive per `lo_inclusive`/`hi_inclusive`. Either bound
    /// may be omitted for an open range.
    pub fn range(
        &self,
        lo: Option<&IndexKey>,
        hi: Option<&IndexKey>,
        lo_inclusive: bool,
        hi_inclusive: bool,
    ) -> Vec<&ConcretePath> {
        let lower = lo
            .cloned()
            .map(|k| if lo_inclusive { Bound::Included(k) } else { Bound::Excluded(k) })
            .unwrap_or(Bound::Unbounded);
        let upper = hi
            .cloned()
            .map(|k| if hi_inclusive { Bound::Included(k) } else { Bound::Excluded(k) })
            .unwrap_or(Bound::Unbounded);
        self.tree
            .range((lower, upper))
            .flat_map(|(_, v)| v.iter())
            .collect()
    }

    pub fn less_than(&self, key: &IndexKey) -> Vec<&ConcretePath> {
        self.tree
            .range((Bound::Unbounded, Bound::Excluded(key.clone())))
            .flat_map(|(_, v)| v.iter())
            .collect()
    }

    pub fn greater_than(&self, key: &IndexKey) -> Vec<&ConcretePath> {
        self.tree
            .range((Bound::Excluded(key.clone()), Bound::Unbounded))
            .flat_map(|(_, v)| v.iter())
            .collect()
    }

    pub fn keys(&self) -> impl Iterator<Item = &IndexKey> {
        self.tree.keys()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            kind: IndexKind::Ordered,
            entry_count: self.tree.values().map(Vec::len).sum(),
            unique_keys: self.tree.len(),
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
    fn range_query_over_ages_s6() {
        let index = OrderedIndex::build(&sample_matches(), "age").unwrap();
        let hits = index.range(Some(&IndexKey::Int(25)), Some(&IndexKey::Int(35)), true, true);
        assert_eq!(hits.len(), 3);
        let hits = index.range(Some(&IndexKey::Int(25)), Some(&IndexKey::Int(30)), true, false);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn greater_than_excludes_the_bound_itself() {
        let index = OrderedIndex::build(&sample_matches(), "age").unwrap();
        let hits = index.greater_than(&IndexKey::Int(30));
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn keys_are_sorted_ascending() {
        let index = OrderedIndex::build(&sample_matches(), "age").unwrap();
        let keys: Vec<_> = index.keys().collect();
        assert_eq!(
            keys,
            vec![&IndexKey::Int(25), &IndexKey::Int(30), &IndexKey::Int(35)]
        );
    }
}
