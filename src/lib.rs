//! KV Cache Server - A key-value service with a sharded LRU cache
//!
//! Reads go through a concurrency-safe sharded LRU cache; misses and all
//! mutations go to a durable store through a bounded connection pool.

pub mod api;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod models;
pub mod pool;
pub mod store;

pub use api::AppState;
pub use config::Config;
pub use coordinator::{CacheCoordinator, DeleteOutcome, ReadOutcome};
