//! Mapping Cache
//!
//! Concurrent memo of parsed store types, keyed by the trimmed type string
//! and the native hint it was resolved with. Entries are never evicted: the
//! set of distinct column types in a schema is small and bounded.

use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::Mapping;
use super::resolver::native_for;
use crate::ast::NativeType;
use crate::parser::parse_type;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    raw: String,
    hint: Option<NativeType>,
}

/// Thread-safe store type cache
#[derive(Debug, Default)]
pub struct MappingCache {
    entries: DashMap<CacheKey, Arc<Mapping>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MappingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached mapping for `raw`, parsing it on first use.
    /// Unparseable strings are not cached and yield `None`.
    pub fn get_or_parse(&self, raw: &str, hint: Option<&NativeType>) -> Option<Arc<Mapping>> {
        let key = CacheKey {
            raw: raw.trim().to_string(),
            hint: hint.cloned(),
        };

        if let Some(entry) = self.entries.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("Mapping cache hit for '{}'", key.raw);
            return Some(Arc::clone(entry.value()));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("Mapping cache miss for '{}'", key.raw);

        let node = parse_type(&key.raw)?;
        let native = native_for(&node, hint);
        let mapping = Arc::new(Mapping::new(node, native));
        tracing::debug!(
            "Cached mapping '{}' -> {} ({})",
            key.raw,
            mapping.store_type,
            mapping.native
        );

        // A racing thread may have parsed the same key; both results are equal.
        let entry = self.entries.entry(key).or_insert(mapping);
        Some(Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_hit_miss() {
        let cache = MappingCache::new();

        let first = cache.get_or_parse("Array(Int32)", None).unwrap();
        let second = cache.get_or_parse("  Array(Int32) ", None).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.native, NativeType::sequence(NativeType::I32));

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate(), 50.0);
    }

    #[test]
    fn test_invalid_type_not_cached() {
        let cache = MappingCache::new();
        assert!(cache.get_or_parse("Tuple(Int32,", None).is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_hint_is_part_of_key() {
        let cache = MappingCache::new();
        let naive = cache.get_or_parse("DateTime64(3)", None).unwrap();
        let offset = cache
            .get_or_parse("DateTime64(3)", Some(&NativeType::DateTimeOffset))
            .unwrap();
        assert_eq!(naive.native, NativeType::DateTime);
        assert_eq!(offset.native, NativeType::DateTimeOffset);
        assert_eq!(naive.store_type, offset.store_type);
        assert_eq!(cache.len(), 2);
    }
}
