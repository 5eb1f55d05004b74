//! Cache Engine
//!
//! Thread-safe handle over a [`CacheStore`]. Every operation holds the single
//! store mutex for its whole duration and never performs I/O while holding
//! it, so operations from different connections are fully serialised.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;

use crate::cache::{CacheStore, Clock, MonotonicClock, StatsSnapshot};
use crate::error::Result;

/// Shared cache handle. Cloning is cheap and every clone sees the same data.
///
/// # Example
/// ```
/// use mini_cache::Cache;
/// use std::time::Duration;
///
/// let cache = Cache::new(1024);
/// cache.put("user:1", "alice", Duration::ZERO).unwrap();
/// assert_eq!(cache.get(b"user:1").unwrap().as_deref(), Some(&b"alice"[..]));
/// assert_eq!(cache.delete(b"user:1").unwrap(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Cache {
    store: Arc<Mutex<CacheStore>>,
    clock: Arc<dyn Clock>,
}

impl Cache {
    /// Creates a cache bounded to `capacity_bytes`, using the system
    /// monotonic clock.
    pub fn new(capacity_bytes: usize) -> Self {
        Self::with_clock(capacity_bytes, Arc::new(MonotonicClock))
    }

    /// Creates a cache reading time from `clock`.
    pub fn with_clock(capacity_bytes: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Arc::new(Mutex::new(CacheStore::new(capacity_bytes))),
            clock,
        }
    }

    /// Stores `value` under `key`; a zero `ttl` never expires.
    ///
    /// Fails only with `InvalidArgument` for an empty key.
    pub fn put(&self, key: impl Into<Bytes>, value: impl Into<Bytes>, ttl: Duration) -> Result<()> {
        let mut store = self.lock();
        let now = self.clock.now();
        store.put(key.into(), value.into(), ttl, now)
    }

    /// Returns the value for `key`, or `None` if absent or expired.
    pub fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        let mut store = self.lock();
        let now = self.clock.now();
        store.get(key, now)
    }

    /// Removes `key`, returning how many entries were removed (0 or 1).
    pub fn delete(&self, key: &[u8]) -> Result<usize> {
        self.lock().delete(key)
    }

    /// Consistent snapshot of occupancy and counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.lock().stats()
    }

    /// Removes every entry whose TTL has elapsed and returns how many were
    /// removed. Expiration is otherwise enforced lazily on access.
    pub fn purge_expired(&self) -> usize {
        let mut store = self.lock();
        let now = self.clock.now();
        store.purge_expired(now)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity_bytes(&self) -> usize {
        self.lock().capacity_bytes()
    }

    // Store methods keep their invariants intact up to any point that could
    // panic, so a poisoned lock is still safe to reuse.
    fn lock(&self) -> MutexGuard<'_, CacheStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
