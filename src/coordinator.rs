//! Cache Coordinator
//!
//! Read-through / write-through policy binding the sharded cache to the
//! pooled backing store.
//!
//! # Ordering
//! - Reads consult the store only after a cache miss.
//! - Writes and deletes mutate the store first and the cache second, so the
//!   cache never holds a value the store has not confirmed.
//!
//! No lock spans both the cache and the store. A read that fetched an old
//! value can populate the cache after a racing write committed a newer one;
//! that entry stays stale until the next write or delete of the key.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::{CacheStats, ShardedCache, StatsSnapshot};
use crate::config::Config;
use crate::error::{CacheError, Result, StoreResult};
use crate::pool::{ConnectionPool, PooledConnection};
use crate::store::{BackingStore, Connection, MemoryStore, SqliteStore, StoreConnection};

// == Outcomes ==
/// Result of a read, tagged with where the value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Served from the cache without touching the store
    Hit(String),
    /// Fetched from the store and cached
    Miss(String),
    /// Neither the cache nor the store has the key
    NotFound,
}

impl ReadOutcome {
    /// Provenance tag reported to clients.
    pub fn source(&self) -> &'static str {
        match self {
            ReadOutcome::Hit(_) => "HIT",
            ReadOutcome::Miss(_) => "MISS",
            ReadOutcome::NotFound => "NOT_FOUND",
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            ReadOutcome::Hit(v) | ReadOutcome::Miss(v) => Some(v),
            ReadOutcome::NotFound => None,
        }
    }
}

/// Result of a delete as reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

// == Cache Coordinator ==
/// Owns the cache, the pool and the read counters for one service instance.
#[derive(Debug)]
pub struct CacheCoordinator {
    cache: ShardedCache,
    pool: ConnectionPool<Connection>,
    stats: CacheStats,
    acquire_timeout: Option<Duration>,
}

impl CacheCoordinator {
    // == Constructors ==
    pub fn new(cache: ShardedCache, pool: ConnectionPool<Connection>) -> Self {
        Self {
            cache,
            pool,
            stats: CacheStats::new(),
            acquire_timeout: None,
        }
    }

    /// Bounds how long a request waits for a pooled connection.
    pub fn with_acquire_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Builds the cache and a pool of connections to `store`.
    pub fn with_store(config: &Config, store: Arc<dyn BackingStore>) -> Result<Self> {
        config.validate()?;
        let cache = ShardedCache::new(config.cache_capacity, config.cache_shards)?;
        info!(
            store = store.name(),
            shards = cache.shard_count(),
            capacity = cache.capacity(),
            pool_size = config.pool_size,
            "Cache coordinator initializing"
        );

        let pool = ConnectionPool::new(config.pool_size, move || store.connect())?;
        Ok(Self::new(cache, pool).with_acquire_timeout(config.acquire_timeout()))
    }

    /// Opens the store named by `config.database_path` and builds on it.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store: Arc<dyn BackingStore> = if config.uses_memory_store() {
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(SqliteStore::open(&config.database_path)?)
        };
        Self::with_store(config, store)
    }

    // == Read ==
    /// Serves `key` from the cache, falling back to the store on a miss.
    ///
    /// Values found in the store are cached; absence is not.
    pub fn read(&self, key: &str) -> Result<ReadOutcome> {
        if let Some(value) = self.cache.get(key) {
            self.stats.record_hit();
            debug!(key, "Cache HIT");
            return Ok(ReadOutcome::Hit(value));
        }

        self.stats.record_miss();
        debug!(key, "Cache MISS");
        match self.with_connection(|conn| conn.read(key))? {
            Some(value) => {
                self.cache.put(key.to_string(), value.clone());
                Ok(ReadOutcome::Miss(value))
            }
            None => Ok(ReadOutcome::NotFound),
        }
    }

    // == Write ==
    /// Upserts `key` in the store, then in the cache.
    ///
    /// A failed store write leaves the cache untouched.
    pub fn write(&self, key: &str, value: String) -> Result<()> {
        self.with_connection(|conn| conn.write(key, &value))
            .inspect_err(|err| warn!(key, error = %err, "Store write failed, cache untouched"))?;
        self.cache.put(key.to_string(), value);
        Ok(())
    }

    // == Delete ==
    /// Deletes `key` from the store, then drops it from the cache.
    ///
    /// The cache entry is removed whatever the store reported, including failure.
    pub fn delete(&self, key: &str) -> Result<DeleteOutcome> {
        let removed = self.with_connection(|conn| conn.delete(key));
        self.cache.remove(key);

        if removed? {
            Ok(DeleteOutcome::Deleted)
        } else {
            Ok(DeleteOutcome::NotFound)
        }
    }

    // == Stats ==
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot(self.cache.evictions(), self.cache.len())
    }

    pub fn cache(&self) -> &ShardedCache {
        &self.cache
    }

    pub fn pool(&self) -> &ConnectionPool<Connection> {
        &self.pool
    }

    // == Teardown ==
    /// Closes every pooled connection. Returns how many were closed.
    pub fn shutdown(self) -> usize {
        self.pool.close()
    }

    fn checkout(&self) -> Result<PooledConnection<'_, Connection>> {
        match self.acquire_timeout {
            None => Ok(self.pool.acquire()),
            Some(timeout) => self
                .pool
                .acquire_timeout(timeout)
                .ok_or(CacheError::PoolExhausted(timeout.as_millis() as u64)),
        }
    }

    /// Runs one store call on a pooled connection, releasing it afterwards.
    ///
    /// Session-level failures mark the connection for replacement.
    fn with_connection<T>(
        &self,
        call: impl FnOnce(&mut dyn StoreConnection) -> StoreResult<T>,
    ) -> Result<T> {
        let mut conn = self.checkout()?;
        let result = call(&mut **conn);
        if let Err(err) = &result {
            if err.is_connection_fault() {
                conn.mark_broken();
            }
        }
        self.pool.release(conn);
        Ok(result?)
    }
}
