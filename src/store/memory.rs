//! In-Memory Backing Store
//!
//! Process-local map shared by all sessions. Counts calls per operation and
//! can be told to fail upcoming calls, which the coordinator tests rely on.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::store::{BackingStore, Connection, StoreConnection};

/// Store operation, used to target injected failures and read call counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Read,
    Write,
    Delete,
}

impl StoreOp {
    fn slot(self) -> usize {
        match self {
            StoreOp::Read => 0,
            StoreOp::Write => 1,
            StoreOp::Delete => 2,
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    data: Mutex<HashMap<String, String>>,
    faults: Mutex<HashMap<StoreOp, VecDeque<StoreError>>>,
    calls: [AtomicU64; 3],
    connects: AtomicU64,
}

impl Shared {
    fn begin(&self, op: StoreOp) -> StoreResult<()> {
        self.calls[op.slot()].fetch_add(1, Ordering::SeqCst);
        match self.faults.lock().get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

// == Memory Store ==
/// Cloneable handle to one shared in-memory table.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` calls of `op` fail with `error`.
    pub fn inject_failures(&self, op: StoreOp, count: usize, error: StoreError) {
        let mut faults = self.shared.faults.lock();
        let queue = faults.entry(op).or_default();
        queue.extend(std::iter::repeat(error).take(count));
    }

    /// Calls of `op` made so far, including failed ones.
    pub fn calls(&self, op: StoreOp) -> u64 {
        self.shared.calls[op.slot()].load(Ordering::SeqCst)
    }

    /// Sessions opened so far.
    pub fn connects(&self) -> u64 {
        self.shared.connects.load(Ordering::SeqCst)
    }

    /// Writes directly, bypassing call counting and fault injection.
    pub fn seed(&self, key: impl Into<String>, value: impl Into<String>) {
        self.shared.data.lock().insert(key.into(), value.into());
    }

    /// Deletes directly, bypassing call counting and fault injection.
    pub fn purge(&self, key: &str) -> bool {
        self.shared.data.lock().remove(key).is_some()
    }

    /// Current stored value, without touching counters.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.shared.data.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.shared.data.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BackingStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn connect(&self) -> StoreResult<Connection> {
        self.shared.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryConnection {
            shared: Arc::clone(&self.shared),
        }))
    }
}

// == Memory Connection ==
struct MemoryConnection {
    shared: Arc<Shared>,
}

impl StoreConnection for MemoryConnection {
    fn read(&mut self, key: &str) -> StoreResult<Option<String>> {
        self.shared.begin(StoreOp::Read)?;
        let value = self.shared.data.lock().get(key).cloned();
        debug!(key, found = value.is_some(), "Memory GET");
        Ok(value)
    }

    fn write(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.shared.begin(StoreOp::Write)?;
        self.shared
            .data
            .lock()
            .insert(key.to_string(), value.to_string());
        debug!(key, "Memory PUT");
        Ok(())
    }

    fn delete(&mut self, key: &str) -> StoreResult<bool> {
        self.shared.begin(StoreOp::Delete)?;
        let removed = self.shared.data.lock().remove(key).is_some();
        debug!(key, removed, "Memory DELETE");
        Ok(removed)
    }
}
