//! Shared test utilities for rediscopy integration tests.
//!
//! Import via `mod common;` in integration test files:
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use rediscopy::store::{Key, MemoryStore, Store, Ttl, ValueDump};
use rediscopy::StoreError;

// ============================================================================
// Fault injection
// ============================================================================

#[derive(Default)]
struct Faults {
    flush: Option<StoreError>,
    scan: Option<StoreError>,
    dump: HashSet<Key>,
    ttl: HashSet<Key>,
    restore: HashSet<Key>,
    vanish: HashSet<Key>,
    vanish_after: HashSet<Key>,
}

/// Call counters of a [`FaultyStore`]
#[derive(Debug, Default)]
pub struct Calls {
    pub scan: AtomicUsize,
    pub dump: AtomicUsize,
    pub ttl: AtomicUsize,
    pub restore: AtomicUsize,
    pub flush: AtomicUsize,
}

impl Calls {
    #[allow(dead_code)]
    pub fn transfers(&self) -> usize {
        self.dump.load(Ordering::SeqCst) + self.restore.load(Ordering::SeqCst)
    }
}

/// A [`MemoryStore`] that fails on demand, counts calls, and measures how
/// many dumps run at the same time.
pub struct FaultyStore {
    inner: MemoryStore,
    faults: Mutex<Faults>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    pub calls: Calls,
}

#[allow(dead_code)]
impl FaultyStore {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self::build(name, None))
    }

    pub fn with_latency(name: &str, latency: Duration) -> Arc<Self> {
        Arc::new(Self::build(name, Some(latency)))
    }

    fn build(name: &str, latency: Option<Duration>) -> Self {
        Self {
            inner: MemoryStore::named(name),
            faults: Mutex::new(Faults::default()),
            latency,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: Calls::default(),
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn fail_flush(&self, error: StoreError) {
        self.faults.lock().flush = Some(error);
    }

    pub fn fail_scan(&self, error: StoreError) {
        self.faults.lock().scan = Some(error);
    }

    pub fn fail_dump(&self, key: &str) {
        self.faults.lock().dump.insert(Key::from(key));
    }

    pub fn fail_ttl(&self, key: &str) {
        self.faults.lock().ttl.insert(Key::from(key));
    }

    pub fn fail_restore(&self, key: &str) {
        self.faults.lock().restore.insert(Key::from(key));
    }

    /// Delete `key` right before it is dumped, as if it expired after enumeration.
    pub fn vanish_before_dump(&self, key: &str) {
        self.faults.lock().vanish.insert(Key::from(key));
    }

    /// Delete `key` once its dump has been taken, so the TTL lookup misses it.
    pub fn vanish_after_dump(&self, key: &str) {
        self.faults.lock().vanish_after.insert(Key::from(key));
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for FaultyStore {
    async fn scan_keys(&self, pattern: &str, batch: usize) -> Result<Vec<Key>, StoreError> {
        self.calls.scan.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.faults.lock().scan.clone() {
            return Err(e);
        }
        self.inner.scan_keys(pattern, batch).await
    }

    async fn dump(&self, key: &Key) -> Result<ValueDump, StoreError> {
        self.calls.dump.fetch_add(1, Ordering::SeqCst);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let (fail, vanish, vanish_after) = {
            let faults = self.faults.lock();
            (
                faults.dump.contains(key),
                faults.vanish.contains(key),
                faults.vanish_after.contains(key),
            )
        };
        if fail {
            return Err(StoreError::Connection("connection reset by peer".into()));
        }
        if vanish {
            self.inner.remove(key);
        }
        let dump = self.inner.dump(key).await;
        if vanish_after {
            self.inner.remove(key);
        }
        dump
    }

    async fn remaining_ttl(&self, key: &Key) -> Result<Ttl, StoreError> {
        self.calls.ttl.fetch_add(1, Ordering::SeqCst);
        if self.faults.lock().ttl.contains(key) {
            return Err(StoreError::Connection("read timed out".into()));
        }
        self.inner.remaining_ttl(key).await
    }

    async fn restore(&self, key: &Key, dump: &ValueDump, ttl: Ttl) -> Result<(), StoreError> {
        self.calls.restore.fetch_add(1, Ordering::SeqCst);
        if self.faults.lock().restore.contains(key) {
            return Err(StoreError::Command("ERR Bad data format".into()));
        }
        self.inner.restore(key, dump, ttl).await
    }

    async fn flush_all(&self) -> Result<(), StoreError> {
        self.calls.flush.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.faults.lock().flush.clone() {
            return Err(e);
        }
        self.inner.flush_all().await
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }
}

// ============================================================================
// Data helpers
// ============================================================================

/// Fill `store` with `count` persistent keys `key:{i}` => `value:{i}`.
#[allow(dead_code)]
pub fn populate(store: &MemoryStore, count: usize) {
    for i in 0..count {
        store.insert(format!("key:{}", i), format!("value:{}", i), None);
    }
}
