//! Backing Store Module
//!
//! Durable key-value persistence consulted on cache misses and for every mutation.
//!
//! # Implementations
//! - [`SqliteStore`] - one SQLite database file shared by all pooled sessions
//! - [`MemoryStore`] - process-local map with fault injection, for tests and `:memory:`

mod memory;
mod sqlite;

pub use memory::{MemoryStore, StoreOp};
pub use sqlite::SqliteStore;

use crate::error::StoreResult;

/// One session with the backing store, owned by whoever holds it from the pool.
pub trait StoreConnection: Send {
    /// Looks up `key`. `Ok(None)` means the key does not exist.
    fn read(&mut self, key: &str) -> StoreResult<Option<String>>;

    /// Inserts or overwrites `key`.
    fn write(&mut self, key: &str, value: &str) -> StoreResult<()>;

    /// Deletes `key`, reporting whether a row existed and was removed.
    fn delete(&mut self, key: &str) -> StoreResult<bool>;
}

/// Pooled handle type used by the coordinator.
pub type Connection = Box<dyn StoreConnection>;

/// Factory for store sessions.
pub trait BackingStore: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &'static str;

    /// Opens a new session.
    fn connect(&self) -> StoreResult<Connection>;
}
