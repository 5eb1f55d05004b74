//! Cache Module
//!
//! Provides in-memory caching bounded by bytes, with LRU eviction and lazy
//! TTL expiration.

mod clock;
mod engine;
mod entry;
mod expiry;
mod lru;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use engine::Cache;
pub use entry::{entry_size, CacheEntry, EntryId, EntryStore, LruLinks};
pub use expiry::{ExpiryIndex, ExpiryTicket};
pub use lru::LruList;
pub use stats::{CacheStats, StatsSnapshot};
pub use store::CacheStore;

// == Public Constants ==
/// Default capacity in bytes (64 MiB)
pub const DEFAULT_CAPACITY_BYTES: usize = 64 * 1024 * 1024;
