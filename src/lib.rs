//! # rediscopy
//!
//! Copies every key from one Redis-compatible server to another.
//!
//! The destination is flushed, the source keyspace is enumerated, and each key
//! is moved with `DUMP` / `PTTL` / `RESTORE` by a fixed pool of concurrent
//! workers. Values travel as opaque dump payloads, so every data type is
//! copied without being decoded, and keys keep their remaining time-to-live.
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`store`] | `Store` trait, Redis and in-memory backends |
//! | [`replication`] | Coordinator, worker pool, per-key transfer |
//! | [`config`] | TOML / CLI configuration |
//! | [`confirm`] | Destructive-action confirmation prompt |
//! | [`error`] | Error types |

pub mod config;
pub mod confirm;
pub mod error;
pub mod replication;
pub mod store;

pub use config::CopyConfig;
pub use error::{CopyError, Result, StoreError};
pub use replication::{CopyReport, ReplicationOptions, Replicator};
pub use store::{Key, MemoryStore, RedisStore, Store, Ttl, ValueDump};
