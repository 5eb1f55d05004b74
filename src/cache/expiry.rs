//! Expiration Index Module
//!
//! Min-heap of expiry tickets ordered by deadline. Tickets are never removed
//! eagerly: a rewrite or delete simply leaves the old ticket behind, and it is
//! recognised as stale when popped because its version no longer matches the
//! live entry (or the key is gone).

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Instant;

use bytes::Bytes;

// == Expiry Ticket ==
/// One `(expires_at, version, key)` tuple.
///
/// Field order defines the ordering: earliest deadline first, then lowest
/// version, which makes pops deterministic for equal deadlines.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExpiryTicket {
    pub expires_at: Instant,
    pub version: u64,
    pub key: Bytes,
}

// == Expiry Index ==
#[derive(Debug, Default)]
pub struct ExpiryIndex {
    heap: BinaryHeap<Reverse<ExpiryTicket>>,
}

impl ExpiryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a deadline for the given entry version.
    pub fn push(&mut self, expires_at: Instant, version: u64, key: Bytes) {
        self.heap.push(Reverse(ExpiryTicket {
            expires_at,
            version,
            key,
        }));
    }

    /// The ticket with the earliest deadline, stale or not.
    pub fn peek(&self) -> Option<&ExpiryTicket> {
        self.heap.peek().map(|Reverse(ticket)| ticket)
    }

    // == Pop Due ==
    /// Pops the earliest ticket if its deadline has been reached at `now`.
    ///
    /// The caller decides whether the ticket is still valid.
    pub fn pop_due(&mut self, now: Instant) -> Option<ExpiryTicket> {
        if self.peek()?.expires_at > now {
            return None;
        }
        self.heap.pop().map(|Reverse(ticket)| ticket)
    }

    /// Drops every ticket for which `keep` returns false.
    pub fn retain(&mut self, mut keep: impl FnMut(&ExpiryTicket) -> bool) {
        self.heap.retain(|Reverse(ticket)| keep(ticket));
    }

    /// Number of tickets, including stale ones.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
