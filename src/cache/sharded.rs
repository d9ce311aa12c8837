//! Sharded Cache Module
//!
//! Routes keys to independently locked shards so that operations on
//! different shards never contend.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::cache::CacheShard;
use crate::error::{CacheError, Result};

// == Sharded Cache ==
/// Fixed set of LRU shards addressed by key hash.
///
/// Per-shard capacity is `max(1, total_capacity / shard_count)`, so the
/// effective capacity may differ from the configured total.
#[derive(Debug)]
pub struct ShardedCache {
    shards: Vec<CacheShard>,
    per_shard_capacity: usize,
}

impl ShardedCache {
    // == Constructor ==
    /// Creates `shard_count` shards sharing `total_capacity`.
    ///
    /// Zero capacity or zero shards is a startup misconfiguration.
    pub fn new(total_capacity: usize, shard_count: usize) -> Result<Self> {
        if total_capacity == 0 {
            return Err(CacheError::Config("cache capacity must be positive".into()));
        }
        if shard_count == 0 {
            return Err(CacheError::Config("shard count must be positive".into()));
        }

        let per_shard_capacity = (total_capacity / shard_count).max(1);
        let shards = (0..shard_count)
            .map(|_| CacheShard::new(per_shard_capacity))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            shards,
            per_shard_capacity,
        })
    }

    // == Routing ==
    /// Index of the shard owning `key`. Stable for the process lifetime.
    pub fn shard_index(&self, key: &str) -> usize {
        // DefaultHasher::new() uses fixed keys, unlike RandomState
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.shards.len() as u64) as usize
    }

    fn shard(&self, key: &str) -> &CacheShard {
        &self.shards[self.shard_index(key)]
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.shard(key).get(key)
    }

    pub fn put(&self, key: String, value: String) {
        self.shard(&key).put(key, value)
    }

    pub fn remove(&self, key: &str) -> bool {
        self.shard(key).remove(key)
    }

    // == Aggregates ==
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Effective total capacity across all shards.
    pub fn capacity(&self) -> usize {
        self.per_shard_capacity * self.shards.len()
    }

    /// Current number of entries, summed shard by shard.
    pub fn len(&self) -> usize {
        self.shards.iter().map(CacheShard::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total LRU evictions across all shards.
    pub fn evictions(&self) -> u64 {
        self.shards.iter().map(CacheShard::evictions).sum()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_sharded_rejects_misconfiguration() {
        assert!(matches!(ShardedCache::new(0, 4), Err(CacheError::Config(_))));
        assert!(matches!(ShardedCache::new(100, 0), Err(CacheError::Config(_))));
    }

    #[test]
    fn test_per_shard_capacity_rounding() {
        let cache = ShardedCache::new(10, 4).unwrap();
        assert_eq!(cache.shard_count(), 4);
        assert_eq!(cache.capacity(), 8);

        // Fewer slots than shards still gives every shard one entry
        let cache = ShardedCache::new(2, 4).unwrap();
        assert_eq!(cache.capacity(), 4);
    }

    #[test]
    fn test_routing_is_stable() {
        let cache = ShardedCache::new(100, 8).unwrap();
        for i in 0..200 {
            let key = format!("key_{}", i);
            let first = cache.shard_index(&key);
            assert!(first < 8);
            for _ in 0..5 {
                assert_eq!(cache.shard_index(&key), first);
            }
        }
    }

    #[test]
    fn test_routing_spreads_keys() {
        let cache = ShardedCache::new(1000, 4).unwrap();
        let mut used = [false; 4];
        for i in 0..100 {
            used[cache.shard_index(&i.to_string())] = true;
        }
        assert!(used.iter().all(|u| *u), "every shard should receive keys");
    }

    #[test]
    fn test_put_get_remove_delegation() {
        let cache = ShardedCache::new(100, 4).unwrap();
        cache.put("alpha".to_string(), "1".to_string());
        cache.put("beta".to_string(), "2".to_string());

        assert_eq!(cache.get("alpha"), Some("1".to_string()));
        assert_eq!(cache.len(), 2);
        assert!(cache.remove("alpha"));
        assert!(!cache.remove("alpha"));
        assert_eq!(cache.get("alpha"), None);
        assert_eq!(cache.get("beta"), Some("2".to_string()));
    }

    #[test]
    fn test_len_never_exceeds_effective_capacity() {
        let cache = ShardedCache::new(16, 4).unwrap();
        for i in 0..500 {
            cache.put(format!("k{}", i), "v".to_string());
        }
        assert!(cache.len() <= cache.capacity());
        assert!(cache.evictions() >= 500 - cache.capacity() as u64);
    }

    #[test]
    fn test_concurrent_access_across_shards() {
        let cache = Arc::new(ShardedCache::new(4000, 8).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..250 {
                        let key = format!("t{}_{}", t, i);
                        cache.put(key.clone(), i.to_string());
                        assert_eq!(cache.get(&key), Some(i.to_string()));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(cache.len() <= cache.capacity());
    }
}
