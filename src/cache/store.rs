//! Cache Store Module
//!
//! Main cache state combining the entry slab, LRU ordering and expiry heap
//! under a byte capacity. `CacheStore` is not synchronised itself; the
//! [`Cache`](crate::cache::Cache) handle owns one behind a mutex and passes
//! in the current instant.

use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::debug;

use crate::cache::{
    CacheEntry, CacheStats, EntryId, EntryStore, ExpiryIndex, LruList, StatsSnapshot,
};
use crate::error::{CacheError, Result};

/// Due expiry tickets popped on every put.
const EXPIRY_SWEEP_BUDGET: usize = 2;

/// Heap size below which stale tickets are never compacted away.
pub(crate) const EXPIRY_COMPACT_MIN: usize = 64;

// == Cache Store ==
/// Byte-bounded LRU storage with lazily enforced TTLs.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: EntryStore,
    /// Recency ordering over `entries`
    lru: LruList,
    /// Pending deadlines, possibly stale
    expiry: ExpiryIndex,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum sum of entry sizes before eviction kicks in
    capacity_bytes: usize,
    /// Sum of `size_bytes` over live entries
    used_bytes: usize,
    /// Last version handed out; shared by all keys
    version: u64,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store holding at most `capacity_bytes` of keys and
    /// values (a single larger entry is still admitted).
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            entries: EntryStore::new(),
            lru: LruList::new(),
            expiry: ExpiryIndex::new(),
            stats: CacheStats::new(),
            capacity_bytes,
            used_bytes: 0,
            version: 0,
        }
    }

    // == Put ==
    /// Stores a key-value pair, replacing any existing value.
    ///
    /// A zero `ttl` means the entry never expires. The written entry becomes
    /// the most recently used, then least recently used entries are evicted
    /// until the store fits its capacity again.
    ///
    /// Every put also pops a few due expiry tickets and compacts the heap
    /// once stale tickets outnumber live entries, so rewrites with a TTL
    /// cannot grow the heap without bound.
    ///
    /// # Arguments
    /// * `key` - Non-empty key
    /// * `value` - Value bytes, may be empty
    /// * `ttl` - Time to live from `now`
    /// * `now` - Current instant
    pub fn put(&mut self, key: Bytes, value: Bytes, ttl: Duration, now: Instant) -> Result<()> {
        ensure_key(&key)?;
        self.pop_expired(now, EXPIRY_SWEEP_BUDGET);

        let version = self.next_version();
        let expires_at = if ttl.is_zero() {
            None
        } else {
            now.checked_add(ttl)
        };

        match self.entries.lookup(&key) {
            Some(id) => {
                if let Some(entry) = self.entries.get_mut(id) {
                    let old_size = entry.rewrite(value, expires_at, version);
                    self.used_bytes = self.used_bytes - old_size + entry.size_bytes;
                }
                self.lru.move_to_front(&mut self.entries, id);
            }
            None => {
                let entry = CacheEntry::new(key.clone(), value, expires_at, version);
                self.used_bytes += entry.size_bytes;
                let id = self.entries.insert(entry);
                self.lru.push_front(&mut self.entries, id);
            }
        }

        if let Some(deadline) = expires_at {
            self.expiry.push(deadline, version, key);
        }

        self.stats.record_set();
        self.enforce_capacity(now);
        self.compact_expiry();
        Ok(())
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Returns `Ok(None)` when the key is absent or its TTL has elapsed; an
    /// expired entry is removed on the spot and counted as both an
    /// expiration and a miss. A hit makes the entry most recently used.
    pub fn get(&mut self, key: &[u8], now: Instant) -> Result<Option<Bytes>> {
        ensure_key(key)?;

        let Some(id) = self.entries.lookup(key) else {
            self.stats.record_miss();
            return Ok(None);
        };

        let expired = self
            .entries
            .get(id)
            .is_some_and(|entry| entry.is_expired_at(now));
        if expired {
            self.remove_entry(id);
            self.stats.record_expiration();
            self.stats.record_miss();
            return Ok(None);
        }

        self.lru.move_to_front(&mut self.entries, id);
        self.stats.record_hit();
        Ok(self.entries.get(id).map(|entry| entry.value.clone()))
    }

    // == Delete ==
    /// Removes an entry by key.
    ///
    /// Returns the number of entries removed (0 or 1). Expiry tickets for the
    /// key are left in the heap and discarded when popped.
    pub fn delete(&mut self, key: &[u8]) -> Result<usize> {
        ensure_key(key)?;

        match self.entries.lookup(key) {
            Some(id) => {
                self.remove_entry(id);
                self.stats.record_delete();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    // == Stats ==
    /// Returns a snapshot of counters and occupancy.
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            used_bytes: self.used_bytes,
            capacity_bytes: self.capacity_bytes,
            entry_count: self.entries.len(),
            hits: self.stats.hits,
            misses: self.stats.misses,
            sets: self.stats.sets,
            deletes: self.stats.deletes,
            evictions: self.stats.evictions,
            expirations: self.stats.expirations,
        }
    }

    // == Purge Expired ==
    /// Pops every due expiry ticket and removes the entries they still
    /// describe.
    ///
    /// Tickets whose key is gone or whose version was superseded are dropped
    /// without touching counters. Returns the number of entries expired.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        self.pop_expired(now, usize::MAX)
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    pub fn capacity_bytes(&self) -> usize {
        self.capacity_bytes
    }

    /// Number of expiry tickets held, stale ones included.
    pub fn pending_expiries(&self) -> usize {
        self.expiry.len()
    }

    /// Keys from most to least recently used.
    pub fn keys_by_recency(&self) -> Vec<Bytes> {
        self.lru
            .iter(&self.entries)
            .filter_map(|id| self.entries.get(id).map(|entry| entry.key.clone()))
            .collect()
    }

    // == Internal Helpers ==

    fn next_version(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    /// Evicts until `used_bytes` fits the capacity.
    ///
    /// Expired entries are reclaimed first. The most recently written entry
    /// is never evicted, so a single oversized value stays resident alone.
    fn enforce_capacity(&mut self, now: Instant) {
        if self.used_bytes <= self.capacity_bytes {
            return;
        }

        let reclaimed = self.purge_expired(now);
        if reclaimed > 0 {
            debug!("Reclaimed {} expired entries under capacity pressure", reclaimed);
        }

        while self.used_bytes > self.capacity_bytes && self.lru.len() > 1 {
            let Some(victim) = self.lru.back() else {
                break;
            };
            if let Some(entry) = self.remove_entry(victim) {
                self.stats.record_eviction();
                debug!(
                    "Evicted LRU entry ({} bytes), used {}/{} bytes",
                    entry.size_bytes, self.used_bytes, self.capacity_bytes
                );
            }
        }
    }

    /// Pops at most `budget` due tickets, removing the entries they still
    /// describe. Returns the number of entries expired.
    fn pop_expired(&mut self, now: Instant, budget: usize) -> usize {
        let mut removed = 0;
        let mut popped = 0;

        while popped < budget {
            let Some(ticket) = self.expiry.pop_due(now) else {
                break;
            };
            popped += 1;

            let Some(id) = self.entries.lookup(&ticket.key) else {
                continue;
            };
            let live = self.entries.get(id).is_some_and(|entry| {
                entry.version == ticket.version && entry.is_expired_at(now)
            });
            if !live {
                continue;
            }

            self.remove_entry(id);
            self.stats.record_expiration();
            removed += 1;
        }

        removed
    }

    /// Rebuilds the heap from live tickets once it holds more than twice as
    /// many tickets as there are entries.
    fn compact_expiry(&mut self) {
        let tickets = self.expiry.len();
        if tickets <= EXPIRY_COMPACT_MIN || tickets <= 2 * self.entries.len() {
            return;
        }

        let entries = &self.entries;
        self.expiry.retain(|ticket| {
            entries
                .lookup(&ticket.key)
                .and_then(|id| entries.get(id))
                .is_some_and(|entry| entry.version == ticket.version)
        });
        debug!(
            "Compacted expiry heap from {} to {} tickets",
            tickets,
            self.expiry.len()
        );
    }

    /// Unlinks and drops an entry, releasing its bytes.
    fn remove_entry(&mut self, id: EntryId) -> Option<CacheEntry> {
        self.lru.unlink(&mut self.entries, id);
        let entry = self.entries.remove(id)?;
        self.used_bytes -= entry.size_bytes;
        Some(entry)
    }
}

fn ensure_key(key: &[u8]) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidArgument(
            "key must not be empty".to_string(),
        ));
    }
    Ok(())
}
