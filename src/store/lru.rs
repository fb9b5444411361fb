//! Bounded LRU Store
//!
//! Keys and recency live in one structure: a `HashMap` whose entries carry
//! prev/next links forming a doubly-linked recency list, keyed by the
//! neighbouring keys themselves. Key-linked adjacency avoids raw pointers
//! while keeping get/set/delete and tail eviction O(1) on average.
//!
//! A single mutex guards the whole structure. Every operation (including a
//! whole-batch `set_many`) runs as one critical section, so the map and the
//! recency list can never disagree and the size bound holds between calls.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

pub struct LruStore {
    capacity: usize,
    inner: Mutex<Inner>,
}

struct Inner {
    map: HashMap<String, Entry>,
    /// Most recently used key.
    head: Option<String>,
    /// Least recently used key; the eviction victim.
    tail: Option<String>,
}

struct Entry {
    value: Value,
    /// Neighbour toward the head (more recent).
    prev: Option<String>,
    /// Neighbour toward the tail (less recent).
    next: Option<String>,
}

impl LruStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Inner {
                map: HashMap::new(),
                head: None,
                tail: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock poisons it; the structure is
        // still consistent because every mutation completes before the
        // guard drops, so recover the guard and continue.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a clone of the stored value and marks the key most recent.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut inner = self.lock();
        let value = inner.map.get(key)?.value.clone();
        inner.move_to_front(key);
        Some(value)
    }

    /// Inserts or overwrites, marking the key most recent. A new key on a
    /// full store evicts the least-recent entry first.
    pub fn set(&self, key: String, value: Value) {
        let mut inner = self.lock();
        inner.insert(key, value, self.capacity);
    }

    /// Applies a whole batch of writes under one lock acquisition: either
    /// all of the batch is visible to other callers or none of it is yet.
    pub fn set_many<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut inner = self.lock();
        for (key, value) in entries {
            inner.insert(key, value, self.capacity);
        }
    }

    /// Removes the entry and its recency node. Returns whether a removal
    /// occurred.
    pub fn delete(&self, key: &str) -> bool {
        let mut inner = self.lock();
        if !inner.map.contains_key(key) {
            return false;
        }
        inner.unlink(key);
        inner.map.remove(key);
        true
    }

    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Inner {
    fn insert(&mut self, key: String, value: Value, capacity: usize) {
        if let Some(entry) = self.map.get_mut(&key) {
            entry.value = value;
            self.move_to_front(&key);
            return;
        }

        if self.map.len() >= capacity {
            if let Some(victim) = self.evict_lru() {
                tracing::debug!("Evicted least-recent key {}", victim);
            }
        }

        self.map.insert(
            key.clone(),
            Entry {
                value,
                prev: None,
                next: None,
            },
        );
        self.push_front(&key);
    }

    fn move_to_front(&mut self, key: &str) {
        if self.head.as_deref() == Some(key) {
            return;
        }
        self.unlink(key);
        self.push_front(key);
    }

    /// Detaches `key` from the recency list, repairing neighbour links
    /// and the head/tail markers. The map entry itself stays.
    fn unlink(&mut self, key: &str) {
        let (prev, next) = match self.map.get(key) {
            Some(entry) => (entry.prev.clone(), entry.next.clone()),
            None => return,
        };

        match prev {
            Some(ref p) => {
                if let Some(prev_entry) = self.map.get_mut(p) {
                    prev_entry.next = next.clone();
                }
            }
            None => self.head = next.clone(),
        }

        match next {
            Some(ref n) => {
                if let Some(next_entry) = self.map.get_mut(n) {
                    next_entry.prev = prev.clone();
                }
            }
            None => self.tail = prev,
        }

        if let Some(entry) = self.map.get_mut(key) {
            entry.prev = None;
            entry.next = None;
        }
    }

    /// Links an already-detached `key` in as the new head.
    fn push_front(&mut self, key: &str) {
        let old_head = self.head.replace(key.to_string());

        if let Some(ref h) = old_head {
            if let Some(head_entry) = self.map.get_mut(h) {
                head_entry.prev = Some(key.to_string());
            }
        }

        if let Some(entry) = self.map.get_mut(key) {
            entry.prev = None;
            entry.next = old_head;
        }

        if self.tail.is_none() {
            self.tail = Some(key.to_string());
        }
    }

    fn evict_lru(&mut self) -> Option<String> {
        let victim = self.tail.clone()?;
        self.unlink(&victim);
        self.map.remove(&victim);
        Some(victim)
    }
}
