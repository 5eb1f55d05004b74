//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the store against a simple reference model of a
//! byte-bounded LRU.

use proptest::prelude::*;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use bytes::Bytes;

use crate::cache::store::EXPIRY_COMPACT_MIN;
use crate::cache::{entry_size, CacheStore};

// == Test Configuration ==
const TEST_CAPACITY: usize = 64;

// == Strategies ==
/// Small key space so operations collide often
fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(b'a'..=b'h', 1..3)
}

/// Arbitrary bytes, including newlines and NULs
fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..24)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Get { key: Vec<u8> },
    Delete { key: Vec<u8> },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        3 => (key_strategy(), value_strategy())
            .prop_map(|(key, value)| CacheOp::Put { key, value }),
        2 => key_strategy().prop_map(|key| CacheOp::Get { key }),
        1 => key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

// == Reference Model ==
/// Front = most recently used.
#[derive(Default)]
struct Model {
    order: VecDeque<(Vec<u8>, Vec<u8>)>,
    evictions: u64,
}

impl Model {
    fn used(&self) -> usize {
        self.order.iter().map(|(k, v)| entry_size(k, v)).sum()
    }

    fn position(&self, key: &[u8]) -> Option<usize> {
        self.order.iter().position(|(k, _)| k == key)
    }

    fn put(&mut self, key: Vec<u8>, value: Vec<u8>, capacity: usize) {
        if let Some(i) = self.position(&key) {
            self.order.remove(i);
        }
        self.order.push_front((key, value));
        while self.used() > capacity && self.order.len() > 1 {
            self.order.pop_back();
            self.evictions += 1;
        }
    }

    fn get(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        let i = self.position(key)?;
        let item = self.order.remove(i)?;
        let value = item.1.clone();
        self.order.push_front(item);
        Some(value)
    }

    fn delete(&mut self, key: &[u8]) -> usize {
        match self.position(key) {
            Some(i) => {
                self.order.remove(i);
                1
            }
            None => 0,
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // For any sequence of puts, gets and deletes, the store holds exactly the
    // model's entries in the model's recency order, so the entry evicted
    // under pressure is always the least recently touched one.
    #[test]
    fn prop_matches_lru_model(ops in prop::collection::vec(cache_op_strategy(), 1..80)) {
        let now = Instant::now();
        let mut store = CacheStore::new(TEST_CAPACITY);
        let mut model = Model::default();

        for op in ops {
            match op {
                CacheOp::Put { key, value } => {
                    store.put(Bytes::from(key.clone()), Bytes::from(value.clone()), Duration::ZERO, now).unwrap();
                    model.put(key, value, TEST_CAPACITY);
                }
                CacheOp::Get { key } => {
                    let got = store.get(&key, now).unwrap().map(|v| v.to_vec());
                    prop_assert_eq!(got, model.get(&key));
                }
                CacheOp::Delete { key } => {
                    prop_assert_eq!(store.delete(&key).unwrap(), model.delete(&key));
                }
            }

            let expected: Vec<Bytes> = model.order.iter().map(|(k, _)| Bytes::from(k.clone())).collect();
            prop_assert_eq!(store.keys_by_recency(), expected);
            prop_assert_eq!(store.used_bytes(), model.used());
        }

        prop_assert_eq!(store.stats().evictions, model.evictions);
    }

    // After every put, used bytes fit the capacity or the store holds exactly
    // one entry that is larger than the capacity on its own.
    #[test]
    fn prop_capacity_invariant(
        entries in prop::collection::vec(
            (key_strategy(), prop::collection::vec(any::<u8>(), 0..100)),
            1..60
        )
    ) {
        let now = Instant::now();
        let mut store = CacheStore::new(TEST_CAPACITY);

        for (key, value) in entries {
            store.put(Bytes::from(key), Bytes::from(value), Duration::ZERO, now).unwrap();
            let stats = store.stats();
            prop_assert!(
                stats.used_bytes <= stats.capacity_bytes
                    || (stats.entry_count == 1 && stats.used_bytes > stats.capacity_bytes),
                "used {} of {} with {} entries",
                stats.used_bytes,
                stats.capacity_bytes,
                stats.entry_count
            );
        }
    }

    // Hits and misses count exactly the gets that found or missed a value;
    // sets count every put, deletes every successful delete.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let now = Instant::now();
        let mut store = CacheStore::new(1024);
        let (mut hits, mut misses, mut sets, mut deletes) = (0u64, 0u64, 0u64, 0u64);

        for op in ops {
            match op {
                CacheOp::Put { key, value } => {
                    store.put(Bytes::from(key), Bytes::from(value), Duration::ZERO, now).unwrap();
                    sets += 1;
                }
                CacheOp::Get { key } => match store.get(&key, now).unwrap() {
                    Some(_) => hits += 1,
                    None => misses += 1,
                },
                CacheOp::Delete { key } => deletes += store.delete(&key).unwrap() as u64,
            }
        }

        let stats = store.stats();
        prop_assert_eq!(stats.hits, hits);
        prop_assert_eq!(stats.misses, misses);
        prop_assert_eq!(stats.sets, sets);
        prop_assert_eq!(stats.deletes, deletes);
        prop_assert_eq!(stats.entry_count, store.len());
    }

    // A value with TTL T is visible at every elapsed time below T and gone at
    // every elapsed time at or above T, whether or not the heap was walked in
    // between.
    #[test]
    fn prop_ttl_correctness(
        ttl_ms in 1u64..1_000,
        elapsed_ms in 0u64..2_000,
        purge_first in any::<bool>()
    ) {
        let start = Instant::now();
        let mut store = CacheStore::new(1024);
        store.put(Bytes::from_static(b"k"), Bytes::from_static(b"v"), Duration::from_millis(ttl_ms), start).unwrap();

        let at = start + Duration::from_millis(elapsed_ms);
        if purge_first {
            store.purge_expired(at);
        }

        let got = store.get(b"k", at).unwrap();
        if elapsed_ms < ttl_ms {
            prop_assert_eq!(got, Some(Bytes::from_static(b"v")));
        } else {
            prop_assert_eq!(got, None);
            prop_assert_eq!(store.stats().expirations, 1);
        }
    }

    // Rewrites and deletes leave stale tickets behind; popping them never
    // removes a live entry or moves the expiration counter.
    #[test]
    fn prop_stale_tickets_are_harmless(
        rewrites in prop::collection::vec((key_strategy(), 1u64..50, any::<bool>()), 1..40)
    ) {
        let start = Instant::now();
        let mut store = CacheStore::new(4096);

        // Every key ends up either deleted or rewritten without a TTL
        for (key, ttl_ms, _) in &rewrites {
            store.put(Bytes::from(key.clone()), Bytes::from_static(b"x"), Duration::from_millis(*ttl_ms), start).unwrap();
        }
        for (key, _, delete) in &rewrites {
            if *delete {
                store.delete(key).unwrap();
            } else {
                store.put(Bytes::from(key.clone()), Bytes::from_static(b"y"), Duration::ZERO, start).unwrap();
            }
        }

        let live_before = store.keys_by_recency();
        let later = start + Duration::from_secs(10);

        prop_assert_eq!(store.purge_expired(later), 0);
        prop_assert_eq!(store.purge_expired(later), 0);
        prop_assert_eq!(store.pending_expiries(), 0);
        prop_assert_eq!(store.stats().expirations, 0);
        prop_assert_eq!(store.keys_by_recency(), live_before.clone());

        for key in live_before {
            prop_assert_eq!(store.get(&key, later).unwrap(), Some(Bytes::from_static(b"y")));
        }
    }

    // Rewrites, deletes and reads at advancing times never let the expiry
    // heap outgrow its compaction bound, however many tickets go stale.
    #[test]
    fn prop_expiry_heap_stays_bounded(
        ops in prop::collection::vec((key_strategy(), 0u64..500, 0u64..20, 0u8..4), 1..400)
    ) {
        let mut now = Instant::now();
        let mut store = CacheStore::new(1 << 20);

        for (key, ttl_ms, step_ms, action) in ops {
            now += Duration::from_millis(step_ms);
            match action {
                0 => {
                    store.delete(&key).unwrap();
                }
                1 => {
                    store.get(&key, now).unwrap();
                }
                _ => {
                    store.put(Bytes::from(key), Bytes::from_static(b"v"), Duration::from_millis(ttl_ms), now).unwrap();
                    prop_assert!(
                        store.pending_expiries() <= EXPIRY_COMPACT_MIN.max(2 * store.len()),
                        "{} tickets for {} entries",
                        store.pending_expiries(),
                        store.len()
                    );
                }
            }
        }
    }
}
