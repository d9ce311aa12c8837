//! Cache Module
//!
//! Provides the concurrency-safe sharded LRU cache and its read statistics.

mod shard;
mod sharded;
mod stats;


// Re-export public types
pub use shard::CacheShard;
pub use sharded::ShardedCache;
pub use stats::{CacheStats, StatsSnapshot};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB
