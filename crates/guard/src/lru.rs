//! Bounded LRU cache.
//!
//! Generic fixed-capacity cache with O(1) `get`, `set` and eviction. Entries
//! live in an index arena threaded onto a doubly linked recency list; slot 0
//! is the head sentinel (most recent side) and slot 1 the tail sentinel
//! (least recent side). Freed slots are recycled, so the arena never grows
//! past `capacity + 2` slots.
//!
//! The cache is not synchronized. Callers wrap it in their own lock, one
//! critical section per cache operation.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

const HEAD: usize = 0;
const TAIL: usize = 1;

#[derive(Debug)]
struct Slot<K, V> {
    entry: Option<(K, V)>,
    prev: usize,
    next: usize,
}

impl<K, V> Slot<K, V> {
    fn sentinel() -> Self {
        Self {
            entry: None,
            prev: HEAD,
            next: TAIL,
        }
    }
}

/// Fixed-capacity least-recently-used cache.
#[derive(Debug)]
pub struct LruCache<K, V> {
    index: HashMap<K, usize>,
    slots: Vec<Slot<K, V>>,
    free: Vec<usize>,
    capacity: usize,
}

impl<K: Hash + Eq + Clone, V> LruCache<K, V> {
    /// Create a cache holding at most `capacity` entries. A capacity of 0 is
    /// treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut slots = Vec::with_capacity(capacity + 2);
        slots.push(Slot::sentinel());
        slots.push(Slot::sentinel());
        Self {
            index: HashMap::with_capacity(capacity),
            slots,
            free: Vec::new(),
            capacity,
        }
    }

    /// Look up `key` and mark it most recently used.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.index.get(key)?;
        self.unlink(idx);
        self.push_front(idx);
        self.slots[idx].entry.as_ref().map(|(_, v)| v)
    }

    /// Look up `key` without touching its recency.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.index.get(key)?;
        self.slots[idx].entry.as_ref().map(|(_, v)| v)
    }

    /// Insert or update `key`, marking it most recently used.
    ///
    /// Inserting a new key into a full cache evicts the least recently used
    /// entry first and returns it.
    pub fn set(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(&idx) = self.index.get(&key) {
            if let Some((_, v)) = self.slots[idx].entry.as_mut() {
                *v = value;
            }
            self.unlink(idx);
            self.push_front(idx);
            return None;
        }

        let evicted = if self.index.len() >= self.capacity {
            self.pop_lru()
        } else {
            None
        };

        let idx = self.alloc(key.clone(), value);
        self.index.insert(key, idx);
        self.push_front(idx);
        evicted
    }

    /// Whether `key` is present. Does not touch recency.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.contains_key(key)
    }

    /// Remove `key`, returning its value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.index.remove(key)?;
        self.release(idx).map(|(_, v)| v)
    }

    /// Remove and return the least recently used entry.
    pub fn pop_lru(&mut self) -> Option<(K, V)> {
        let idx = self.slots[TAIL].prev;
        if idx == HEAD {
            return None;
        }
        let (key, value) = self.release(idx)?;
        self.index.remove(&key);
        Some((key, value))
    }

    /// Keep only the entries for which `keep` returns true. Returns the number removed.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&K, &V) -> bool,
    {
        let mut removed = 0;
        let mut idx = self.slots[HEAD].next;
        while idx != TAIL {
            let next = self.slots[idx].next;
            let drop_it = match &self.slots[idx].entry {
                Some((k, v)) => !keep(k, v),
                None => false,
            };
            if drop_it {
                if let Some((key, _)) = self.release(idx) {
                    self.index.remove(&key);
                    removed += 1;
                }
            }
            idx = next;
        }
        removed
    }

    /// Keys from most to least recently used.
    pub fn keys_by_recency(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.index.len());
        let mut idx = self.slots[HEAD].next;
        while idx != TAIL {
            if let Some((k, _)) = &self.slots[idx].entry {
                keys.push(k.clone());
            }
            idx = self.slots[idx].next;
        }
        keys
    }

    /// Number of entries.
    pub fn count(&self) -> usize {
        self.index.len()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.index.clear();
        self.slots.truncate(2);
        self.slots[HEAD] = Slot::sentinel();
        self.slots[TAIL] = Slot::sentinel();
        self.free.clear();
    }

    fn alloc(&mut self, key: K, value: V) -> usize {
        let slot = Slot {
            entry: Some((key, value)),
            prev: HEAD,
            next: TAIL,
        };
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = slot;
                idx
            }
            None => {
                self.slots.push(slot);
                self.slots.len() - 1
            }
        }
    }

    /// Unlink `idx`, put it on the free list and hand back its entry.
    fn release(&mut self, idx: usize) -> Option<(K, V)> {
        self.unlink(idx);
        self.free.push(idx);
        self.slots[idx].entry.take()
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);
        self.slots[prev].next = next;
        self.slots[next].prev = prev;
    }

    fn push_front(&mut self, idx: usize) {
        let first = self.slots[HEAD].next;
        self.slots[idx].prev = HEAD;
        self.slots[idx].next = first;
        self.slots[first].prev = idx;
        self.slots[HEAD].next = idx;
    }
}
