//! Bounded cache of completed assets
//!
//! Entries are kept in eviction order: the front entry is dropped first when
//! an insert would exceed the maximum size. Under [`EvictionPolicy::Fifo`]
//! that is the oldest inserted entry; under [`EvictionPolicy::Lru`] every
//! read moves the entry to the back.

use crate::asset::AssetHandle;
use crate::config::EvictionPolicy;
use indexmap::IndexMap;

/// Statistics about the asset cache
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CacheStats {
    /// Number of entries in the cache
    pub entries: usize,
    pub max_entries: usize,
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// Get the hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f32 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f32 / total as f32
        }
    }
}

/// Size-bounded asset cache
pub struct AssetCache {
    entries: IndexMap<String, AssetHandle>,
    max_entries: usize,
    policy: EvictionPolicy,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl AssetCache {
    /// Create a cache holding at most `max_entries` (at least one) assets
    pub fn new(max_entries: usize, policy: EvictionPolicy) -> Self {
        Self {
            entries: IndexMap::new(),
            max_entries: max_entries.max(1),
            policy,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Look up an asset, counting a hit or miss
    pub fn get(&mut self, key: &str) -> Option<AssetHandle> {
        let Some(index) = self.entries.get_index_of(key) else {
            self.misses += 1;
            return None;
        };
        self.hits += 1;

        if self.policy == EvictionPolicy::Lru {
            let last = self.entries.len() - 1;
            self.entries.move_index(index, last);
        }
        self.entries.get(key).cloned()
    }

    /// Look up an asset without touching statistics or recency
    pub fn peek(&self, key: &str) -> Option<&AssetHandle> {
        self.entries.get(key)
    }

    /// Insert an asset, evicting the front entry first if the cache is full
    ///
    /// Re-inserting an existing key replaces its handle without evicting.
    /// Returns the key of the evicted entry, if any.
    pub fn insert(&mut self, key: String, asset: AssetHandle) -> Option<String> {
        if let Some((index, _, slot)) = self.entries.get_full_mut(&key) {
            *slot = asset;
            if self.policy == EvictionPolicy::Lru {
                let last = self.entries.len() - 1;
                self.entries.move_index(index, last);
            }
            return None;
        }

        let evicted = if self.entries.len() >= self.max_entries {
            self.evict_front()
        } else {
            None
        };
        self.entries.insert(key, asset);
        evicted
    }

    /// Remove and return an asset from the cache
    pub fn remove(&mut self, key: &str) -> Option<AssetHandle> {
        self.entries.shift_remove(key)
    }

    /// Drop every entry; statistics are kept
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            max_entries: self.max_entries,
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
        }
    }

    /// Check if a key is in the cache
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Keys in eviction order, next victim first
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    fn evict_front(&mut self) -> Option<String> {
        let (key, _) = self.entries.shift_remove_index(0)?;
        self.evictions += 1;
        tracing::debug!("Evicted asset '{}' from cache", key);
        Some(key)
    }
}

impl Default for AssetCache {
    fn default() -> Self {
        Self::new(50, EvictionPolicy::Fifo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{LoadedAsset, Transform};
    use crate::format::AssetFormat;
    use crate::loader::ModelData;
    use std::rc::Rc;

    fn create_test_asset(path: &str) -> AssetHandle {
        Rc::new(LoadedAsset {
            key: path.to_string(),
            path: path.to_string(),
            format: AssetFormat::Glb,
            data: ModelData::default(),
            transform: Transform::default(),
        })
    }

    fn fill(cache: &mut AssetCache, keys: &[&str]) {
        for key in keys {
            cache.insert(key.to_string(), create_test_asset(key));
        }
    }

    #[test]
    fn test_cache_insert_get() {
        let mut cache = AssetCache::new(10, EvictionPolicy::Fifo);
        fill(&mut cache, &["a", "b"]);

        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_none());
    }

    #[test]
    fn test_fifo_evicts_oldest_inserted() {
        let mut cache = AssetCache::new(2, EvictionPolicy::Fifo);
        fill(&mut cache, &["a", "b"]);

        // Reads do not protect an entry under FIFO
        cache.get("a");
        assert_eq!(
            cache.insert("c".into(), create_test_asset("c")),
            Some("a".to_string())
        );

        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
        assert!(cache.contains("c"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_lru_evicts_least_recently_used() {
        let mut cache = AssetCache::new(2, EvictionPolicy::Lru);
        fill(&mut cache, &["a", "b"]);

        // Access a to make it more recent
        cache.get("a");
        cache.insert("c".into(), create_test_asset("c"));

        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn test_size_never_exceeds_max() {
        let mut cache = AssetCache::new(3, EvictionPolicy::Fifo);
        let keys: Vec<String> = (0..10).map(|i| format!("m{}.glb", i)).collect();
        for key in &keys {
            cache.insert(key.clone(), create_test_asset(key));
            assert!(cache.len() <= 3);
        }

        let remaining: Vec<&String> = cache.keys().collect();
        assert_eq!(remaining, vec!["m7.glb", "m8.glb", "m9.glb"]);
        assert_eq!(cache.stats().evictions, 7);
    }

    #[test]
    fn test_reinsert_does_not_evict() {
        let mut cache = AssetCache::new(2, EvictionPolicy::Fifo);
        fill(&mut cache, &["a", "b"]);
        assert_eq!(cache.insert("a".into(), create_test_asset("a")), None);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.keys().next().map(String::as_str), Some("a"));
    }

    #[test]
    fn test_cache_stats() {
        let mut cache = AssetCache::new(10, EvictionPolicy::Fifo);
        fill(&mut cache, &["a"]);

        cache.get("a"); // Hit
        cache.get("a"); // Hit
        cache.get("b"); // Miss
        cache.peek("b");

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 1e-6);
    }
}
