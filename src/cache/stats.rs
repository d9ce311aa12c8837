//! Cache Statistics Module
//!
//! Tracks read outcomes with lock-free counters and renders snapshots for the stats query.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Cumulative hit/miss counters, updated on every read.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Record Hit ==
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Miss ==
    /// Counts a read that had to go to the store, whether or not the key existed.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    // == Snapshot ==
    /// Captures the counters together with cache occupancy figures.
    pub fn snapshot(&self, evictions: u64, total_entries: usize) -> StatsSnapshot {
        StatsSnapshot::new(self.hits(), self.misses(), evictions, total_entries)
    }
}

// == Stats Snapshot ==
/// Point-in-time view of cache performance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Reads served from the cache
    pub hits: u64,
    /// Reads that consulted the backing store
    pub misses: u64,
    /// Entries dropped by LRU eviction
    pub evictions: u64,
    /// Current number of cached entries
    pub total_entries: usize,
    /// hits / (hits + misses)
    pub hit_rate: f64,
}

impl StatsSnapshot {
    pub fn new(hits: u64, misses: u64, evictions: u64, total_entries: usize) -> Self {
        let total = hits + misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };
        Self {
            hits,
            misses,
            evictions,
            total_entries,
            hit_rate,
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats.hits(), 0);
        assert_eq!(stats.misses(), 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let snapshot = CacheStats::new().snapshot(0, 0);
        assert_eq!(snapshot.hit_rate, 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();

        let snapshot = stats.snapshot(2, 7);
        assert_eq!(snapshot.hits, 3);
        assert_eq!(snapshot.misses, 1);
        assert_eq!(snapshot.evictions, 2);
        assert_eq!(snapshot.total_entries, 7);
        assert!((snapshot.hit_rate - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_counters_under_concurrency() {
        let stats = Arc::new(CacheStats::new());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let stats = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        stats.record_hit();
                        stats.record_miss();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(stats.hits(), 4000);
        assert_eq!(stats.misses(), 4000);
    }

    #[test]
    fn test_snapshot_serialize() {
        let json = serde_json::to_string(&StatsSnapshot::new(1, 1, 0, 1)).unwrap();
        assert!(json.contains("\"hit_rate\":0.5"));
        assert!(json.contains("total_entries"));
    }
}
