//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.
//! Values are fixed for the lifetime of the process.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Database path that selects the in-process store instead of SQLite.
pub const MEMORY_DATABASE: &str = ":memory:";

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Total number of entries across all cache shards
    pub cache_capacity: usize,
    /// Number of independently locked cache shards
    pub cache_shards: usize,
    /// Number of pooled backing store connections
    pub pool_size: usize,
    /// Upper bound on waiting for a pooled connection, None = wait forever
    pub acquire_timeout_ms: Option<u64>,
    /// SQLite database file, or `:memory:` for the in-process store
    pub database_path: String,
    /// HTTP bind address
    pub server_host: String,
    /// HTTP server port
    pub server_port: u16,
    /// Directory for timestamped log files, None = console only
    pub log_dir: Option<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Total cache entries (default: 1000)
    /// - `CACHE_SHARDS` - Number of cache shards (default: 4)
    /// - `DB_POOL_SIZE` - Pooled store connections (default: 4)
    /// - `POOL_ACQUIRE_TIMEOUT_MS` - Bounded pool wait (default: unbounded)
    /// - `DATABASE_PATH` - SQLite file (default: kv_store.db)
    /// - `SERVER_HOST` - Bind address (default: 127.0.0.1)
    /// - `SERVER_PORT` - HTTP server port (default: 8080)
    /// - `LOG_DIR` - Also write logs to a file in this directory (default: unset)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_capacity: parse_var("CACHE_CAPACITY").unwrap_or(defaults.cache_capacity),
            cache_shards: parse_var("CACHE_SHARDS").unwrap_or(defaults.cache_shards),
            pool_size: parse_var("DB_POOL_SIZE").unwrap_or(defaults.pool_size),
            acquire_timeout_ms: parse_var("POOL_ACQUIRE_TIMEOUT_MS"),
            database_path: env::var("DATABASE_PATH").unwrap_or(defaults.database_path),
            server_host: env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            log_dir: env::var("LOG_DIR").ok().filter(|dir| !dir.is_empty()),
        }
    }

    /// Rejects settings the cache or pool cannot be built from.
    pub fn validate(&self) -> Result<()> {
        if self.cache_capacity == 0 {
            return Err(CacheError::Config("cache capacity must be positive".into()));
        }
        if self.cache_shards == 0 {
            return Err(CacheError::Config("shard count must be positive".into()));
        }
        if self.pool_size == 0 {
            return Err(CacheError::Config("pool size must be positive".into()));
        }
        Ok(())
    }

    /// Bounded pool wait, if configured.
    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout_ms.map(Duration::from_millis)
    }

    /// Whether the in-process store was requested.
    pub fn uses_memory_store(&self) -> bool {
        self.database_path == MEMORY_DATABASE
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_capacity: 1000,
            cache_shards: 4,
            pool_size: 4,
            acquire_timeout_ms: None,
            database_path: "kv_store.db".to_string(),
            server_host: "127.0.0.1".to_string(),
            server_port: 8080,
            log_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.cache_capacity, 1000);
        assert_eq!(config.cache_shards, 4);
        assert_eq!(config.pool_size, 4);
        assert_eq!(config.acquire_timeout(), None);
        assert_eq!(config.server_port, 8080);
        assert!(!config.uses_memory_store());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("CACHE_CAPACITY");
        env::remove_var("CACHE_SHARDS");
        env::remove_var("DB_POOL_SIZE");
        env::remove_var("POOL_ACQUIRE_TIMEOUT_MS");
        env::remove_var("SERVER_PORT");
        env::remove_var("LOG_DIR");

        let config = Config::from_env();
        assert_eq!(config.cache_capacity, 1000);
        assert_eq!(config.cache_shards, 4);
        assert_eq!(config.pool_size, 4);
        assert_eq!(config.acquire_timeout_ms, None);
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        let zero_capacity = Config {
            cache_capacity: 0,
            ..Config::default()
        };
        assert!(matches!(zero_capacity.validate(), Err(CacheError::Config(_))));

        let zero_shards = Config {
            cache_shards: 0,
            ..Config::default()
        };
        assert!(matches!(zero_shards.validate(), Err(CacheError::Config(_))));

        let zero_pool = Config {
            pool_size: 0,
            ..Config::default()
        };
        assert!(matches!(zero_pool.validate(), Err(CacheError::Config(_))));
    }

    #[test]
    fn test_acquire_timeout_conversion() {
        let config = Config {
            acquire_timeout_ms: Some(250),
            ..Config::default()
        };
        assert_eq!(config.acquire_timeout(), Some(Duration::from_millis(250)));
    }
}
