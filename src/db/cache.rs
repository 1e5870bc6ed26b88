//! Bounded least-recently-used cache.
//!
//! Entries live in a `DashMap` next to the value of a monotonically
//! increasing access clock. Eviction scans for the smallest stamp, which is
//! cheap at the sizes configured for user lookups.

use dashmap::DashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Concurrent LRU cache with hit/miss counters.
#[derive(Debug)]
pub struct LruCache<K: Eq + Hash, V> {
    entries: DashMap<K, Entry<V>>,
    clock: AtomicU64,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    stamp: u64,
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    /// Create a cache holding at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            clock: AtomicU64::new(0),
            capacity: capacity.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Look up a value, marking it as recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        let stamp = self.tick();
        match self.entries.get_mut(key) {
            Some(mut entry) => {
                entry.stamp = stamp;
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert or replace a value, evicting the least recently used entry
    /// when over capacity.
    pub fn insert(&self, key: K, value: V) {
        let stamp = self.tick();
        self.entries.insert(key, Entry { value, stamp });
        while self.entries.len() > self.capacity {
            let victim = self
                .entries
                .iter()
                .min_by_key(|e| e.value().stamp)
                .map(|e| e.key().clone());
            match victim {
                Some(k) => {
                    trace!(key = ?k, "Evicting cache entry");
                    self.entries.remove(&k);
                }
                None => break,
            }
        }
    }

    pub fn remove(&self, key: &K) {
        self.entries.remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_least_recently_used() {
        let cache = LruCache::new(2);
        cache.insert(1, "a");
        cache.insert(2, "b");
        assert_eq!(cache.get(&1), Some("a"));
        cache.insert(3, "c");
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&1), Some("a"));
        assert_eq!(cache.get(&3), Some("c"));
    }

    #[test]
    fn counts_hits_and_misses() {
        let cache = LruCache::new(4);
        assert_eq!(cache.get(&"x"), None::<u8>);
        cache.insert("x", 1u8);
        assert_eq!(cache.get(&"x"), Some(1));
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn replace_keeps_size() {
        let cache = LruCache::new(1);
        cache.insert(7, 1);
        cache.insert(7, 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&7), Some(2));
        cache.remove(&7);
        assert!(cache.is_empty());
    }
}
