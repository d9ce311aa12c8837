//! Connection Pool Module
//!
//! Fixed-size set of reusable backing store sessions with blocking acquire/release.
//!
//! Connections are opened eagerly at construction and recycled for the
//! pool's lifetime. A connection that failed at the session level is
//! replaced on release; everything else is handed back as-is.

use std::collections::VecDeque;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::error::{CacheError, Result, StoreResult};

/// Opens one new session with the backing store.
pub type Connector<C> = Box<dyn Fn() -> StoreResult<C> + Send + Sync>;

// == Slot ==
/// A pooled connection tagged with its stable position in the pool.
struct Slot<C> {
    id: usize,
    conn: C,
}

// == Connection Pool ==
/// Bounded pool of store connections.
///
/// At most `size` connections are ever checked out. Waiters block on a
/// condition variable; each release wakes one of them. The idle-set lock is
/// held only to enqueue or dequeue, never across a store call.
pub struct ConnectionPool<C> {
    idle: Mutex<VecDeque<Slot<C>>>,
    available: Condvar,
    size: usize,
    connector: Connector<C>,
}

impl<C> ConnectionPool<C> {
    // == Constructor ==
    /// Opens `size` connections through `connector`.
    ///
    /// Fails if `size` is zero or any connection cannot be opened.
    pub fn new<F>(size: usize, connector: F) -> Result<Self>
    where
        F: Fn() -> StoreResult<C> + Send + Sync + 'static,
    {
        if size == 0 {
            return Err(CacheError::Config("pool size must be positive".into()));
        }

        let mut idle = VecDeque::with_capacity(size);
        for id in 0..size {
            let conn = connector()?;
            idle.push_back(Slot { id, conn });
        }
        info!(size, "Connection pool initialized");

        Ok(Self {
            idle: Mutex::new(idle),
            available: Condvar::new(),
            size,
            connector: Box::new(connector),
        })
    }

    // == Acquire ==
    /// Blocks until a connection is free and returns exclusive ownership of it.
    ///
    /// There is no timeout and no limit on the number of waiters.
    pub fn acquire(&self) -> PooledConnection<'_, C> {
        let mut idle = self.idle.lock();
        loop {
            if let Some(slot) = idle.pop_front() {
                return PooledConnection::new(self, slot);
            }
            self.available.wait(&mut idle);
        }
    }

    /// Like [`acquire`](Self::acquire) but gives up after `timeout`.
    pub fn acquire_timeout(&self, timeout: Duration) -> Option<PooledConnection<'_, C>> {
        let deadline = Instant::now() + timeout;
        let mut idle = self.idle.lock();
        loop {
            if let Some(slot) = idle.pop_front() {
                return Some(PooledConnection::new(self, slot));
            }
            if self.available.wait_until(&mut idle, deadline).timed_out() {
                return idle
                    .pop_front()
                    .map(|slot| PooledConnection::new(self, slot));
            }
        }
    }

    // == Release ==
    /// Returns a connection to the idle set and wakes one waiter.
    pub fn release(&self, conn: PooledConnection<'_, C>) {
        drop(conn);
    }

    fn put_back(&self, mut slot: Slot<C>, broken: bool) {
        if broken {
            // Reconnect outside the lock so waiters are not held up
            match (self.connector)() {
                Ok(fresh) => {
                    slot.conn = fresh;
                    info!(id = slot.id, "Replaced broken pooled connection");
                }
                Err(err) => {
                    warn!(id = slot.id, error = %err, "Reconnect failed, keeping existing connection");
                }
            }
        }

        self.idle.lock().push_back(slot);
        self.available.notify_one();
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Connections currently waiting in the idle set.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    // == Teardown ==
    /// Closes every connection and returns how many were closed.
    ///
    /// Outstanding [`PooledConnection`]s borrow the pool, so this can only
    /// run once all of them have been released.
    pub fn close(self) -> usize {
        let idle = self.idle.into_inner();
        let closed = idle.len();
        drop(idle);
        info!(closed, "Connection pool closed");
        closed
    }
}

impl<C> fmt::Debug for ConnectionPool<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("size", &self.size)
            .field("idle", &self.idle_count())
            .finish()
    }
}

// == Pooled Connection ==
/// Exclusive handle to one pooled connection, returned to the pool on drop.
pub struct PooledConnection<'a, C> {
    pool: &'a ConnectionPool<C>,
    slot: Option<Slot<C>>,
    broken: bool,
}

impl<'a, C> PooledConnection<'a, C> {
    fn new(pool: &'a ConnectionPool<C>, slot: Slot<C>) -> Self {
        debug!(id = slot.id, "Acquired pooled connection");
        Self {
            pool,
            slot: Some(slot),
            broken: false,
        }
    }

    fn slot(&self) -> &Slot<C> {
        self.slot.as_ref().expect("slot is present until drop")
    }

    /// Stable position of this connection within the pool.
    pub fn id(&self) -> usize {
        self.slot().id
    }

    /// Flags the session as unusable so the pool replaces it on release.
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }
}

impl<C> Deref for PooledConnection<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.slot().conn
    }
}

impl<C> DerefMut for PooledConnection<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self
            .slot
            .as_mut()
            .expect("slot is present until drop")
            .conn
    }
}

impl<C> Drop for PooledConnection<'_, C> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            debug!(id = slot.id, "Released pooled connection");
            self.pool.put_back(slot, self.broken);
        }
    }
}
