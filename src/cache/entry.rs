//! Cache Entry Module
//!
//! Defines individual cache entries and the slab that owns them. Entries are
//! addressed by a stable [`EntryId`] so the LRU list can link them without
//! separate ownership.

use std::collections::HashMap;
use std::time::Instant;

use bytes::Bytes;

// == Entry Id ==
/// Stable handle to an occupied slot in the [`EntryStore`].
///
/// Ids are reused after an entry is removed, so a handle must not be held
/// across a removal of the entry it points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(usize);

// == LRU Links ==
/// Intrusive neighbours of an entry in the recency ordering.
///
/// `prev` points towards the most recently used end, `next` towards the
/// least recently used end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LruLinks {
    pub prev: Option<EntryId>,
    pub next: Option<EntryId>,
}

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The key this entry is indexed under
    pub key: Bytes,
    /// The stored value, opaque bytes
    pub value: Bytes,
    /// `key.len() + value.len()`, recomputed on every write
    pub size_bytes: usize,
    /// Expiration instant, None = no expiration
    pub expires_at: Option<Instant>,
    /// Write version, used to recognise stale expiry tickets
    pub version: u64,
    /// Position in the LRU ordering
    pub(crate) links: LruLinks,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new, unlinked entry.
    pub fn new(key: Bytes, value: Bytes, expires_at: Option<Instant>, version: u64) -> Self {
        let size_bytes = entry_size(&key, &value);
        Self {
            key,
            value,
            size_bytes,
            expires_at,
            version,
            links: LruLinks::default(),
        }
    }

    // == Rewrite ==
    /// Replaces value and expiry in place, keeping the LRU links.
    ///
    /// Returns the size the entry had before the rewrite.
    pub fn rewrite(&mut self, value: Bytes, expires_at: Option<Instant>, version: u64) -> usize {
        let old_size = self.size_bytes;
        self.size_bytes = entry_size(&self.key, &value);
        self.value = value;
        self.expires_at = expires_at;
        self.version = version;
        old_size
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// An entry is expired once `now >= expires_at`; entries without an
    /// expiration never expire.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }
}

/// Accounted size of a key/value pair.
pub fn entry_size(key: &[u8], value: &[u8]) -> usize {
    key.len() + value.len()
}

// == Entry Store ==
/// Owns every live entry and maps keys to their slots.
#[derive(Debug, Default)]
pub struct EntryStore {
    index: HashMap<Bytes, EntryId>,
    slots: Vec<Option<CacheEntry>>,
    free: Vec<usize>,
}

impl EntryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the slot holding `key`.
    pub fn lookup(&self, key: &[u8]) -> Option<EntryId> {
        self.index.get(key).copied()
    }

    pub fn get(&self, id: EntryId) -> Option<&CacheEntry> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: EntryId) -> Option<&mut CacheEntry> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    // == Insert ==
    /// Stores a new entry and returns its id.
    ///
    /// The key must not already be present; use [`EntryStore::lookup`] and
    /// rewrite the existing entry instead.
    pub fn insert(&mut self, entry: CacheEntry) -> EntryId {
        debug_assert!(!self.index.contains_key(&entry.key));
        let key = entry.key.clone();
        let id = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(entry);
                EntryId(slot)
            }
            None => {
                self.slots.push(Some(entry));
                EntryId(self.slots.len() - 1)
            }
        };
        self.index.insert(key, id);
        id
    }

    // == Remove ==
    /// Removes the entry in slot `id`, freeing the slot for reuse.
    ///
    /// The caller is responsible for unlinking it from the LRU list first.
    pub fn remove(&mut self, id: EntryId) -> Option<CacheEntry> {
        let entry = self.slots.get_mut(id.0)?.take()?;
        self.index.remove(&entry.key);
        self.free.push(id.0);
        Some(entry)
    }

    pub(crate) fn links(&self, id: EntryId) -> Option<LruLinks> {
        self.get(id).map(|entry| entry.links)
    }

    pub(crate) fn links_mut(&mut self, id: EntryId) -> Option<&mut LruLinks> {
        self.get_mut(id).map(|entry| &mut entry.links)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn entry(key: &'static str, value: &'static str) -> CacheEntry {
        CacheEntry::new(Bytes::from(key), Bytes::from(value), None, 1)
    }

    #[test]
    fn test_entry_size_counts_key_and_value() {
        let e = entry("key", "value");
        assert_eq!(e.size_bytes, 8);
        assert!(e.expires_at.is_none());
    }

    #[test]
    fn test_entry_empty_value_is_allowed() {
        let e = entry("k", "");
        assert_eq!(e.size_bytes, 1);
        assert!(e.value.is_empty());
    }

    #[test]
    fn test_rewrite_recomputes_size_and_bumps_version() {
        let mut e = entry("key", "v");
        let deadline = Instant::now() + Duration::from_secs(5);

        let old = e.rewrite(Bytes::from("longer value"), Some(deadline), 7);

        assert_eq!(old, 4);
        assert_eq!(e.size_bytes, 15);
        assert_eq!(e.version, 7);
        assert_eq!(e.expires_at, Some(deadline));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = Instant::now();
        let e = CacheEntry::new(Bytes::from("k"), Bytes::from("v"), Some(now), 1);

        // Expired exactly at the deadline, not before
        assert!(e.is_expired_at(now));
        assert!(e.is_expired_at(now + Duration::from_millis(1)));
        assert!(!e.is_expired_at(now - Duration::from_millis(1)));
    }

    #[test]
    fn test_no_expiration_never_expires() {
        let e = entry("k", "v");
        assert!(!e.is_expired_at(Instant::now() + Duration::from_secs(86_400)));
    }

    #[test]
    fn test_store_insert_lookup_remove() {
        let mut store = EntryStore::new();
        let a = store.insert(entry("a", "1"));
        let b = store.insert(entry("b", "2"));

        assert_eq!(store.len(), 2);
        assert_eq!(store.lookup(b"a"), Some(a));
        assert_eq!(store.get(b).map(|e| e.value.clone()), Some(Bytes::from("2")));

        let removed = store.remove(a).unwrap();
        assert_eq!(removed.key, Bytes::from("a"));
        assert_eq!(store.lookup(b"a"), None);
        assert!(store.get(a).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_reuses_freed_slots() {
        let mut store = EntryStore::new();
        let a = store.insert(entry("a", "1"));
        store.remove(a);

        let c = store.insert(entry("c", "3"));
        assert_eq!(c, a);
        assert_eq!(store.lookup(b"c"), Some(c));
    }

    #[test]
    fn test_store_remove_twice_is_noop() {
        let mut store = EntryStore::new();
        let a = store.insert(entry("a", "1"));
        assert!(store.remove(a).is_some());
        assert!(store.remove(a).is_none());
        assert!(store.is_empty());
    }
}
