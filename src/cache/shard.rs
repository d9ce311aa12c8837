//! Cache Shard Module
//!
//! One lock-protected, fixed-capacity LRU partition of the cache.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::trace;

use crate::error::{CacheError, Result};

// == LRU Node ==
/// A slot in the shard's arena, linked to its neighbours by slot index.
#[derive(Debug, Default)]
struct Node {
    key: String,
    value: String,
    prev: Option<usize>,
    next: Option<usize>,
}

// == LRU List ==
/// Unlocked recency list backing a shard.
///
/// Entries live in a slot arena sized once at construction and are chained
/// into a doubly linked list where:
/// - `head` = Most recently used
/// - `tail` = Least recently used
///
/// `index` maps each key to its slot, so lookup, promotion and eviction are O(1).
#[derive(Debug)]
struct LruList {
    nodes: Vec<Node>,
    free: Vec<usize>,
    index: HashMap<String, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    capacity: usize,
    evictions: u64,
}

impl LruList {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            free: Vec::new(),
            index: HashMap::with_capacity(capacity),
            head: None,
            tail: None,
            capacity,
            evictions: 0,
        }
    }

    fn detach(&mut self, slot: usize) {
        let (prev, next) = (self.nodes[slot].prev, self.nodes[slot].next);
        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].prev = prev,
            None => self.tail = prev,
        }
        self.nodes[slot].prev = None;
        self.nodes[slot].next = None;
    }

    fn push_front(&mut self, slot: usize) {
        self.nodes[slot].prev = None;
        self.nodes[slot].next = self.head;
        match self.head {
            Some(h) => self.nodes[h].prev = Some(slot),
            None => self.tail = Some(slot),
        }
        self.head = Some(slot);
    }

    fn promote(&mut self, slot: usize) {
        if self.head != Some(slot) {
            self.detach(slot);
            self.push_front(slot);
        }
    }

    fn get(&mut self, key: &str) -> Option<String> {
        let slot = *self.index.get(key)?;
        self.promote(slot);
        Some(self.nodes[slot].value.clone())
    }

    /// Inserts or overwrites `key`, returning the key evicted to make room.
    fn put(&mut self, key: String, value: String) -> Option<String> {
        if let Some(&slot) = self.index.get(&key) {
            self.nodes[slot].value = value;
            self.promote(slot);
            return None;
        }

        let mut evicted = None;
        let slot = match self.tail {
            // Reuse the evicted tail's slot for the new entry
            Some(tail) if self.index.len() >= self.capacity => {
                self.detach(tail);
                let old_key = std::mem::take(&mut self.nodes[tail].key);
                self.index.remove(&old_key);
                self.evictions += 1;
                evicted = Some(old_key);
                tail
            }
            _ => match self.free.pop() {
                Some(slot) => slot,
                None => {
                    self.nodes.push(Node::default());
                    self.nodes.len() - 1
                }
            },
        };

        self.nodes[slot].key = key.clone();
        self.nodes[slot].value = value;
        self.index.insert(key, slot);
        self.push_front(slot);
        evicted
    }

    fn remove(&mut self, key: &str) -> bool {
        match self.index.remove(key) {
            Some(slot) => {
                self.detach(slot);
                self.nodes[slot] = Node::default();
                self.free.push(slot);
                true
            }
            None => false,
        }
    }

    fn keys(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(self.index.len());
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            keys.push(self.nodes[slot].key.clone());
            cursor = self.nodes[slot].next;
        }
        keys
    }
}

// == Cache Shard ==
/// An independently locked LRU partition.
///
/// Every operation takes the shard lock for its own duration only.
#[derive(Debug)]
pub struct CacheShard {
    state: Mutex<LruList>,
}

impl CacheShard {
    // == Constructor ==
    /// Creates an empty shard holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(CacheError::Config("shard capacity must be positive".into()));
        }
        Ok(Self {
            state: Mutex::new(LruList::with_capacity(capacity)),
        })
    }

    // == Get ==
    /// Returns the value for `key` and marks it most recently used.
    pub fn get(&self, key: &str) -> Option<String> {
        self.state.lock().get(key)
    }

    // == Put ==
    /// Stores `value` under `key`, evicting the least recently used entry if full.
    pub fn put(&self, key: String, value: String) {
        let evicted = self.state.lock().put(key, value);
        if let Some(evicted) = evicted {
            trace!(key = %evicted, "Cache eviction: removed LRU key");
        }
    }

    // == Remove ==
    /// Deletes `key` if present. Returns whether an entry was removed.
    pub fn remove(&self, key: &str) -> bool {
        self.state.lock().remove(key)
    }

    pub fn len(&self) -> usize {
        self.state.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().capacity
    }

    /// Number of entries dropped by LRU eviction since construction.
    pub fn evictions(&self) -> u64 {
        self.state.lock().evictions
    }

    /// Keys ordered from most to least recently used.
    pub fn keys(&self) -> Vec<String> {
        self.state.lock().keys()
    }
}
