//! LRU query-result cache (§4.5).
//!
//! Keyed on `(canonical path string, document.version)`. A mutation bumps
//! `version`, which changes every subsequent key — stale entries are never
//! looked up again rather than needing to be walked and purged, per the
//! "query cache invalidation → monotonic version counter" design note.

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::query::evaluator::QueryMatch;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    expression: String,
    version: u64,
}

pub struct QueryCache {
    inner: LruCache<CacheKey, Vec<QueryMatch>>,
    stats: CacheStats,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            inner: LruCache::new(cap),
            stats: CacheStats::default(),
        }
    }

    pub fn get(&mut self, expression: &str, version: u64) -> Option<Vec<QueryMatch>> {
        let key = CacheKey {
            expression: expression.to_string(),
            version,
        };
        match self.inner.get(&key) {
            Some(v) => {
                self.stats.hits += 1;
                Some(v.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    pub fn put(&mut self, expression: &str, version: u64, results: Vec<QueryMatch>) {
        let key = CacheKey {
            expression: expression.to_string(),
            version,
        };
        self.inner.put(key, results);
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Entries are never evicted on mutation — version-bumping alone makes
    /// them unreachable. This is exposed only for tests that want to assert
    /// the cache is in fact empty of *old*-version entries by capacity
    /// pressure rather than explicit invalidation.
    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_query_on_same_version_hits() {
        let mut cache = QueryCache::new();
        assert!(cache.get("$.users", 1).is_none());
        cache.put("$.users", 1, Vec::new());
        for _ in 0..99 {
            assert!(cache.get("$.users", 1).is_some());
        }
        let stats = cache.stats();
        assert!(stats.misses <= 1);
        assert!(stats.hits >= 99);
    }

    #[test]
    fn version_bump_is_a_miss() {
        let mut cache = QueryCache::new();
        cache.put("$.users", 1, Vec::new());
        assert!(cache.get("$.users", 2).is_none());
    }
}
