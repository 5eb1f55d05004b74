//! LRU Ordering Module
//!
//! Implements the recency ordering used for eviction as an intrusive
//! doubly-linked list threaded through the entries of an [`EntryStore`].

use crate::cache::entry::{EntryId, EntryStore, LruLinks};

// == LRU List ==
/// Tracks access order for LRU eviction strategy.
///
/// - Front (head) = Most recently used
/// - Back (tail) = Least recently used
///
/// Every operation is O(1). The list stores only the two ends; the links
/// live inside the entries themselves.
#[derive(Debug, Default)]
pub struct LruList {
    head: Option<EntryId>,
    tail: Option<EntryId>,
    len: usize,
}

impl LruList {
    // == Constructor ==
    /// Creates a new empty list.
    pub fn new() -> Self {
        Self::default()
    }

    // == Push Front ==
    /// Links an unlinked entry in as most recently used.
    pub fn push_front(&mut self, store: &mut EntryStore, id: EntryId) {
        let old_head = self.head;
        match store.links_mut(id) {
            Some(links) => {
                *links = LruLinks {
                    prev: None,
                    next: old_head,
                }
            }
            None => return,
        }

        match old_head {
            Some(h) => {
                if let Some(head_links) = store.links_mut(h) {
                    head_links.prev = Some(id);
                }
            }
            None => self.tail = Some(id),
        }

        self.head = Some(id);
        self.len += 1;
    }

    // == Unlink ==
    /// Removes an entry from the ordering. Unlinked entries are ignored.
    pub fn unlink(&mut self, store: &mut EntryStore, id: EntryId) {
        let Some(links) = store.links(id) else {
            return;
        };
        if links.prev.is_none() && self.head != Some(id) {
            return;
        }

        match links.prev {
            Some(p) => {
                if let Some(prev) = store.links_mut(p) {
                    prev.next = links.next;
                }
            }
            None => self.head = links.next,
        }
        match links.next {
            Some(n) => {
                if let Some(next) = store.links_mut(n) {
                    next.prev = links.prev;
                }
            }
            None => self.tail = links.prev,
        }

        if let Some(own) = store.links_mut(id) {
            *own = LruLinks::default();
        }
        self.len -= 1;
    }

    // == Touch ==
    /// Marks an entry as recently used (moves to front).
    pub fn move_to_front(&mut self, store: &mut EntryStore, id: EntryId) {
        if self.front() == Some(id) {
            return;
        }
        self.unlink(store, id);
        self.push_front(store, id);
    }

    // == Peek Oldest ==
    /// Returns the least recently used entry without removing it.
    pub fn back(&self) -> Option<EntryId> {
        self.tail
    }

    /// Returns the most recently used entry.
    pub fn front(&self) -> Option<EntryId> {
        self.head
    }

    /// Walks the ordering from most to least recently used.
    pub fn iter<'a>(&self, store: &'a EntryStore) -> impl Iterator<Item = EntryId> + 'a {
        std::iter::successors(self.head, move |id| store.links(*id).and_then(|l| l.next))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
