//! Property-based tests for full replication runs
//!
//! Random keyspaces, including binary keys and keys with and without TTLs,
//! are copied between in-process stores and compared afterwards.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use rediscopy::replication::{ReplicationOptions, Replicator};
use rediscopy::store::{Key, MemoryStore, Ttl};

// ============================================================================
// Test Strategies
// ============================================================================

/// Binary-safe keys
fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..24)
}

/// Arbitrary value bytes
fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..128)
}

/// `None` for persistent keys, otherwise a TTL far enough out not to expire mid-test
fn ttl_strategy() -> impl Strategy<Value = Option<Duration>> {
    prop::option::of((60u64..86_400).prop_map(Duration::from_secs))
}

fn keyspace_strategy() -> impl Strategy<Value = HashMap<Vec<u8>, (Vec<u8>, Option<Duration>)>> {
    prop::collection::hash_map(key_strategy(), (value_strategy(), ttl_strategy()), 0..64)
}

fn replicate(source: &Arc<MemoryStore>, dest: &Arc<MemoryStore>, concurrency: usize) -> u64 {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let options = ReplicationOptions {
        concurrency: NonZeroUsize::new(concurrency).unwrap(),
        status_interval: 0,
        ..Default::default()
    };
    let report = runtime
        .block_on(Replicator::new(source.clone(), dest.clone(), options).run())
        .unwrap();
    report.attempted()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: every key arrives with the same value and a TTL that never grows
    #[test]
    fn prop_copy_preserves_values_and_ttls(
        keyspace in keyspace_strategy(),
        concurrency in 1usize..16,
    ) {
        let source = Arc::new(MemoryStore::new());
        let dest = Arc::new(MemoryStore::new());
        for (key, (value, ttl)) in &keyspace {
            source.insert(key.clone(), value.clone(), *ttl);
        }

        let attempted = replicate(&source, &dest, concurrency);
        prop_assert_eq!(attempted as usize, keyspace.len());
        prop_assert_eq!(dest.keys(), source.keys());

        for (raw, (value, ttl)) in &keyspace {
            let key = Key::from(raw.clone());
            let got = dest.get(&key);
            prop_assert_eq!(got.as_deref(), Some(value.as_slice()));
            match (ttl, dest.ttl(&key)) {
                (None, Some(Ttl::Persistent)) => {}
                (Some(original), Some(Ttl::Expires(left))) => prop_assert!(left <= *original),
                (expected, actual) => prop_assert!(
                    false,
                    "ttl mismatch for {}: expected {:?}, got {:?}",
                    key,
                    expected,
                    actual
                ),
            }
        }
    }

    /// Property: the destination's previous contents never survive a run
    #[test]
    fn prop_destination_is_replaced(
        source_keys in keyspace_strategy(),
        dest_keys in keyspace_strategy(),
    ) {
        let source = Arc::new(MemoryStore::new());
        let dest = Arc::new(MemoryStore::new());
        for (key, (value, ttl)) in &source_keys {
            source.insert(key.clone(), value.clone(), *ttl);
        }
        for (key, (value, ttl)) in &dest_keys {
            dest.insert(key.clone(), value.clone(), *ttl);
        }

        replicate(&source, &dest, 4);
        prop_assert_eq!(dest.keys(), source.keys());
    }
}
