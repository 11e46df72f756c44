//! Store client abstraction
//!
//! The replication engine only depends on the [`Store`] trait: list keys,
//! dump a value, read its remaining TTL, restore a dump, and flush everything.
//! How a backend talks to its server is irrelevant to the engine, only the
//! success / failure / not-found semantics of each call matter.

pub mod memory;
pub mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreError;

/// Opaque key identifier. Keys are binary safe; they are only rendered as
/// text (lossily) for logs.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(Bytes);

impl Key {
    /// Create a key from raw bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Printable form of the key.
    pub fn to_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_lossy())
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({:?})", self.to_lossy())
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self(Bytes::from(s))
    }
}

impl From<Vec<u8>> for Key {
    fn from(v: Vec<u8>) -> Self {
        Self(Bytes::from(v))
    }
}

/// Serialized value as produced by `DUMP`. Never inspected, only carried
/// from the source to the destination.
#[derive(Clone, PartialEq, Eq)]
pub struct ValueDump(Bytes);

impl ValueDump {
    /// Wrap a dump payload.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for ValueDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueDump({} bytes)", self.0.len())
    }
}

/// Remaining lifetime of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// The key never expires
    Persistent,
    /// The key expires after the given duration
    Expires(Duration),
}

impl Ttl {
    /// Translate a `PTTL` reply. `-1` is persistent, `-2` (or any other
    /// negative value) means the key does not exist.
    pub fn from_pttl(millis: i64) -> Result<Self, StoreError> {
        match millis {
            -1 => Ok(Ttl::Persistent),
            m if m < 0 => Err(StoreError::NotFound),
            m => Ok(Ttl::Expires(Duration::from_millis(m as u64))),
        }
    }

    /// Millisecond argument for `RESTORE`, where `0` means no expiry.
    ///
    /// A finite TTL is never encoded as `0`: a key about to expire is restored
    /// with one millisecond left instead of becoming persistent.
    pub fn restore_millis(&self) -> u64 {
        match self {
            Ttl::Persistent => 0,
            Ttl::Expires(d) => u64::try_from(d.as_millis()).unwrap_or(u64::MAX).max(1),
        }
    }
}

/// Connection to a key-value store.
///
/// Implementations must be safe to share between all workers of a run.
#[async_trait]
pub trait Store: Send + Sync {
    /// List every key matching a glob `pattern`, each key exactly once.
    /// `batch` is a hint for how many keys to fetch per round trip.
    async fn scan_keys(&self, pattern: &str, batch: usize) -> Result<Vec<Key>, StoreError>;

    /// Serialize the value stored at `key`.
    async fn dump(&self, key: &Key) -> Result<ValueDump, StoreError>;

    /// Remaining TTL of `key`.
    async fn remaining_ttl(&self, key: &Key) -> Result<Ttl, StoreError>;

    /// Install `dump` at `key` with `ttl`, replacing any existing value.
    async fn restore(&self, key: &Key, dump: &ValueDump, ttl: Ttl) -> Result<(), StoreError>;

    /// Remove every key from the store.
    async fn flush_all(&self) -> Result<(), StoreError>;

    /// Human readable endpoint label used in logs.
    fn describe(&self) -> String;
}
