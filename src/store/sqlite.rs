//! SQLite Backing Store
//!
//! Persists pairs in a single `key_value` table. Every pooled session is its
//! own `rusqlite::Connection` to the same database file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::OptionalExtension;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::store::{BackingStore, Connection, StoreConnection};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS key_value (
    key_name TEXT PRIMARY KEY,
    value TEXT NOT NULL
)";
const SELECT_VALUE: &str = "SELECT value FROM key_value WHERE key_name = ?1";
const UPSERT_VALUE: &str = "INSERT INTO key_value (key_name, value) VALUES (?1, ?2)
    ON CONFLICT(key_name) DO UPDATE SET value = excluded.value";
const DELETE_KEY: &str = "DELETE FROM key_value WHERE key_name = ?1";

/// How long a session waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// == SQLite Store ==
/// Store backed by one SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `path` and ensures the schema.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Connection(format!("Failed to create data dir: {}", e))
            })?;
        }

        let store = Self { path };
        let conn = store.open_session()?;
        conn.execute(CREATE_TABLE, [])?;
        info!(path = %store.path.display(), "SQLite store ready");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_session(&self) -> StoreResult<rusqlite::Connection> {
        let conn = rusqlite::Connection::open(&self.path)
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        // WAL lets readers proceed while another session writes
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        Ok(conn)
    }
}

impl BackingStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn connect(&self) -> StoreResult<Connection> {
        let conn = self.open_session()?;
        debug!(path = %self.path.display(), "Opened SQLite session");
        Ok(Box::new(SqliteConnection { conn }))
    }
}

// == SQLite Connection ==
struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl StoreConnection for SqliteConnection {
    fn read(&mut self, key: &str) -> StoreResult<Option<String>> {
        let mut stmt = self.conn.prepare_cached(SELECT_VALUE)?;
        let value = stmt
            .query_row([key], |row| row.get::<_, String>(0))
            .optional()?;
        debug!(key, found = value.is_some(), "DB GET");
        Ok(value)
    }

    fn write(&mut self, key: &str, value: &str) -> StoreResult<()> {
        let mut stmt = self.conn.prepare_cached(UPSERT_VALUE)?;
        stmt.execute([key, value])?;
        debug!(key, "DB PUT");
        Ok(())
    }

    fn delete(&mut self, key: &str) -> StoreResult<bool> {
        let mut stmt = self.conn.prepare_cached(DELETE_KEY)?;
        let affected = stmt.execute([key])?;
        debug!(key, affected, "DB DELETE");
        Ok(affected > 0)
    }
}
