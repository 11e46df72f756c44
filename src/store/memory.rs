//! In-process store
//!
//! A [`Store`] kept entirely in memory. It follows the Redis semantics the
//! replication engine relies on: lazy expiry, `-1`/`-2` style TTL answers,
//! `RESTORE ... REPLACE` and glob key matching. Dumps are the stored bytes
//! behind a short version header, and restores reject payloads without it,
//! the same way a server rejects a dump from an incompatible version.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use parking_lot::RwLock;

use super::{Key, Store, Ttl, ValueDump};
use crate::error::StoreError;

/// Header prepended to every dump payload.
const DUMP_HEADER: &[u8] = b"MEMDUMP1";

#[derive(Debug, Clone)]
struct Entry {
    value: Bytes,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Thread-safe in-memory key-value store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    name: String,
    entries: RwLock<BTreeMap<Key, Entry>>,
}

impl MemoryStore {
    /// Create an empty store labelled `memory`.
    pub fn new() -> Self {
        Self::named("memory")
    }

    /// Create an empty store with a custom label for logs.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Set `key` to `value`, optionally expiring after `ttl`.
    pub fn insert(&self, key: impl Into<Key>, value: impl Into<Bytes>, ttl: Option<Duration>) {
        let entry = Entry {
            value: value.into(),
            expires_at: ttl.and_then(|d| Instant::now().checked_add(d)),
        };
        self.entries.write().insert(key.into(), entry);
    }

    /// Current value of `key`, if it exists and has not expired.
    pub fn get(&self, key: &Key) -> Option<Bytes> {
        let now = Instant::now();
        self.entries
            .read()
            .get(key)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.value.clone())
    }

    /// Remaining TTL of `key`, `None` if the key is absent.
    pub fn ttl(&self, key: &Key) -> Option<Ttl> {
        let now = Instant::now();
        let entries = self.entries.read();
        let entry = entries.get(key).filter(|e| !e.is_expired(now))?;
        Some(match entry.expires_at {
            Some(at) => Ttl::Expires(at.saturating_duration_since(now)),
            None => Ttl::Persistent,
        })
    }

    /// Delete `key`. Returns whether it existed.
    pub fn remove(&self, key: &Key) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// Live keys in key order.
    pub fn keys(&self) -> Vec<Key> {
        let now = Instant::now();
        self.entries
            .read()
            .iter()
            .filter(|(_, e)| !e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .values()
            .filter(|e| !e.is_expired(now))
            .count()
    }

    /// Whether the store holds no live keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn live_entry(&self, key: &Key) -> Option<Entry> {
        let now = Instant::now();
        let mut entries = self.entries.write();
        match entries.get(key) {
            Some(e) if e.is_expired(now) => {
                entries.remove(key);
                None
            }
            Some(e) => Some(e.clone()),
            None => None,
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn scan_keys(&self, pattern: &str, _batch: usize) -> Result<Vec<Key>, StoreError> {
        Ok(self
            .keys()
            .into_iter()
            .filter(|k| glob_match(pattern.as_bytes(), k.as_bytes()))
            .collect())
    }

    async fn dump(&self, key: &Key) -> Result<ValueDump, StoreError> {
        let entry = self.live_entry(key).ok_or(StoreError::NotFound)?;
        let mut buf = BytesMut::with_capacity(DUMP_HEADER.len() + entry.value.len());
        buf.put_slice(DUMP_HEADER);
        buf.put_slice(&entry.value);
        Ok(ValueDump::new(buf.freeze()))
    }

    async fn remaining_ttl(&self, key: &Key) -> Result<Ttl, StoreError> {
        self.ttl(key).ok_or(StoreError::NotFound)
    }

    async fn restore(&self, key: &Key, dump: &ValueDump, ttl: Ttl) -> Result<(), StoreError> {
        let payload = dump
            .as_bytes()
            .strip_prefix(DUMP_HEADER)
            .ok_or_else(|| {
                StoreError::Command("ERR DUMP payload version or checksum are wrong".to_string())
            })?;
        // a deadline past what Instant can represent never arrives
        let expires_at = match ttl {
            Ttl::Persistent => None,
            ttl => Instant::now().checked_add(Duration::from_millis(ttl.restore_millis())),
        };
        self.entries.write().insert(
            key.clone(),
            Entry {
                value: Bytes::copy_from_slice(payload),
                expires_at,
            },
        );
        Ok(())
    }

    async fn flush_all(&self) -> Result<(), StoreError> {
        self.entries.write().clear();
        Ok(())
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

/// Byte-wise glob matcher supporting `*` and `?`.
///
/// Single pass with backtracking to the most recent `*`.
fn glob_match(pattern: &[u8], key: &[u8]) -> bool {
    let (mut p, mut k) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while k < key.len() {
        match pattern.get(p) {
            Some(b'*') => {
                star = Some((p, k));
                p += 1;
            }
            Some(&c) if c == b'?' || c == key[k] => {
                p += 1;
                k += 1;
            }
            _ => match star {
                Some((sp, sk)) => {
                    p = sp + 1;
                    k = sk + 1;
                    star = Some((sp, sk + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == b'*')
}
