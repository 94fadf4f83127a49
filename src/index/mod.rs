//! Secondary indices over a document's values (§4.7): a hash index for O(1)
//! exact lookups and an ordered index for O(log N) range queries.

pub mod hash_index;
pub mod ordered_index;

pub use hash_index::HashIndex;
pub use ordered_index::OrderedIndex;

use crate::query::ConcretePath;

/// A key extracted from the indexed value, comparable across entries. Mixed
/// numeric/string fields sort numbers before strings (an arbitrary but total
/// order — see `Ord` impl) rather than refusing to build the index.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum IndexKey {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl Eq for IndexKey {}

impl Ord for IndexKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.partial_cmp(other).unwrap_or_else(|| {
            // NaN-involving float comparisons, or cross-variant comparisons
            // PartialOrd can't order, fall back to a stable discriminant
            // order so the index can still be built and iterated.
            discriminant_rank(self).cmp(&discriminant_rank(other))
        })
    }
}

fn discriminant_rank(k: &IndexKey) -> u8 {
    match k {
        IndexKey::Int(_) => 0,
        IndexKey::Float(_) => 1,
        IndexKey::Str(_) => 2,
        IndexKey::Bool(_) => 3,
    }
}

impl std::hash::Hash for IndexKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            IndexKey::Int(i) => i.hash(state),
            IndexKey::Float(f) => f.to_bits().hash(state),
            IndexKey::Str(s) => s.hash(state),
            IndexKey::Bool(b) => b.hash(state),
        }
    }
}

impl IndexKey {
    pub fn from_value(v: &crate::value::Value) -> Option<IndexKey> {
        match v {
            crate::value::Value::Int(i) => Some(IndexKey::Int(*i)),
            crate::value::Value::Float(f) => Some(IndexKey::Float(*f)),
            crate::value::Value::Str(s) => Some(IndexKey::Str(s.clone())),
            crate::value::Value::Bool(b) => Some(IndexKey::Bool(*b)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Hash,
    Ordered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub kind: IndexKind,
    pub entry_count: usize,
    pub unique_keys: usize,
}

/// Uniformly rejects dangerous field names, shared by both index kinds.
pub(crate) fn check_field_name(name: &str) -> crate::error::TonlResult<()> {
    crate::value::Value::check_key_safe(name).map_err(Into::into)
}

pub type IndexEntry = ConcretePath;
