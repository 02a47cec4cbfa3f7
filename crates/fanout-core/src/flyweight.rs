#![forbid(unsafe_code)]

//! Explicit shared-instance cache.
//!
//! [`FlyweightCache`] hands out one shared `Arc<V>` per key, so every caller
//! asking for the same key gets the same instance. The cache is an ordinary
//! value passed to whoever needs it; there is no process-wide store.
//!
//! # Invariants
//!
//! 1. While a key is cached, every lookup returns the same allocation.
//! 2. A bounded cache never holds more than `capacity` keys; the oldest
//!    inserted key is evicted first.
//! 3. The constructor closure runs without the cache lock held. When two
//!    threads race on a missing key, the first insertion wins and the loser's
//!    value is discarded.
//! 4. Evicted and cleared values are dropped after the lock is released, so a
//!    value's `Drop` may use the cache.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

struct CacheInner<K, V: ?Sized> {
    map: HashMap<K, Arc<V>>,
    /// Insertion order, oldest first. Only maintained for bounded caches.
    order: VecDeque<K>,
    evictions: u64,
}

/// Keyed cache of shared instances with an optional capacity bound.
pub struct FlyweightCache<K, V: ?Sized> {
    inner: Mutex<CacheInner<K, V>>,
    capacity: Option<usize>,
}

impl<K, V: ?Sized> fmt::Debug for FlyweightCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("FlyweightCache")
            .field("len", &inner.map.len())
            .field("capacity", &self.capacity)
            .field("evictions", &inner.evictions)
            .finish()
    }
}

impl<K: Eq + Hash + Clone, V: ?Sized> Default for FlyweightCache<K, V> {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl<K: Eq + Hash + Clone, V: ?Sized> FlyweightCache<K, V> {
    /// A cache that never evicts.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                map: HashMap::new(),
                order: VecDeque::new(),
                evictions: 0,
            }),
            capacity: None,
        }
    }

    /// A cache holding at most `capacity` keys (minimum 1).
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            ..Self::unbounded()
        }
    }

    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Shared instance for `key`, if cached.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.inner.lock().map.get(key).cloned()
    }

    /// Shared instance for `key`, building it with `make` on a miss.
    pub fn get_or_insert_with(&self, key: K, make: impl FnOnce() -> Arc<V>) -> Arc<V> {
        if let Some(hit) = self.get(&key) {
            return hit;
        }
        let fresh = make();

        let mut evicted = Vec::new();
        let shared = {
            let mut inner = self.inner.lock();
            if let Some(raced) = inner.map.get(&key) {
                Arc::clone(raced)
            } else {
                if let Some(capacity) = self.capacity {
                    while inner.map.len() >= capacity {
                        let Some(oldest) = inner.order.pop_front() else {
                            break;
                        };
                        evicted.extend(inner.map.remove(&oldest));
                        inner.evictions += 1;
                        trace!(evictions = inner.evictions, "flyweight evicted oldest entry");
                    }
                    inner.order.push_back(key.clone());
                }
                inner.map.insert(key, Arc::clone(&fresh));
                fresh
            }
        };
        drop(evicted);
        shared
    }

    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().map.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total keys evicted since creation.
    #[must_use]
    pub fn evictions(&self) -> u64 {
        self.inner.lock().evictions
    }

    /// Drop every cached instance. Values are released after the lock.
    pub fn clear(&self) {
        let removed = {
            let mut inner = self.inner.lock();
            inner.order.clear();
            std::mem::take(&mut inner.map)
        };
        drop(removed);
    }
}

impl<K: Eq + Hash + Clone, V> FlyweightCache<K, V> {
    /// Sized-value convenience for [`get_or_insert_with`](Self::get_or_insert_with).
    pub fn intern(&self, key: K, make: impl FnOnce() -> V) -> Arc<V> {
        self.get_or_insert_with(key, || Arc::new(make()))
    }
}
