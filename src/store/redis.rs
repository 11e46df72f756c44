//! Redis-protocol store backend
//!
//! Talks RESP to any Redis-compatible server (Redis, Ferrite, ...) through a
//! single multiplexed connection from the `redis` crate. The connection is
//! cheap to clone and pipelines requests from all workers over one socket.

use std::collections::HashSet;

use ::redis::aio::MultiplexedConnection;
use ::redis::IntoConnectionInfo;
use async_trait::async_trait;
use tracing::debug;

use super::{Key, Store, Ttl, ValueDump};
use crate::config::EndpointConfig;
use crate::error::{CopyError, StoreError};

/// A Redis-compatible server reached over TCP.
#[derive(Clone)]
pub struct RedisStore {
    addr: String,
    db: i64,
    conn: MultiplexedConnection,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("addr", &self.addr)
            .field("db", &self.db)
            .finish()
    }
}

impl RedisStore {
    /// Connect to `endpoint`, authenticating and selecting its database.
    pub async fn connect(endpoint: &EndpointConfig) -> Result<Self, CopyError> {
        let connection_error = |source: StoreError| CopyError::Connection {
            endpoint: endpoint.addr.clone(),
            source,
        };

        let mut info = format!("redis://{}", endpoint.addr)
            .as_str()
            .into_connection_info()
            .map_err(|e| connection_error(e.into()))?;
        info.redis.db = endpoint.db;
        info.redis.password = endpoint.password.clone().filter(|p| !p.is_empty());

        debug!(addr = %endpoint.addr, db = endpoint.db, "connecting");
        let client = ::redis::Client::open(info).map_err(|e| connection_error(e.into()))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| connection_error(e.into()))?;

        Ok(Self {
            addr: endpoint.addr.clone(),
            db: endpoint.db,
            conn,
        })
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn scan_keys(&self, pattern: &str, batch: usize) -> Result<Vec<Key>, StoreError> {
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut seen = HashSet::new();
        let mut keys = Vec::new();

        // SCAN may return an element more than once
        loop {
            let (next, page): (u64, Vec<Vec<u8>>) = ::redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(batch)
                .query_async(&mut conn)
                .await?;

            for raw in page {
                let key = Key::from(raw);
                if seen.insert(key.clone()) {
                    keys.push(key);
                }
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(keys)
    }

    async fn dump(&self, key: &Key) -> Result<ValueDump, StoreError> {
        let mut conn = self.conn.clone();
        let payload: Option<Vec<u8>> = ::redis::cmd("DUMP")
            .arg(key.as_bytes())
            .query_async(&mut conn)
            .await?;
        payload.map(ValueDump::new).ok_or(StoreError::NotFound)
    }

    async fn remaining_ttl(&self, key: &Key) -> Result<Ttl, StoreError> {
        let mut conn = self.conn.clone();
        let millis: i64 = ::redis::cmd("PTTL")
            .arg(key.as_bytes())
            .query_async(&mut conn)
            .await?;
        Ttl::from_pttl(millis)
    }

    async fn restore(&self, key: &Key, dump: &ValueDump, ttl: Ttl) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = ::redis::cmd("RESTORE")
            .arg(key.as_bytes())
            .arg(ttl.restore_millis())
            .arg(dump.as_bytes())
            .arg("REPLACE")
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn flush_all(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = ::redis::cmd("FLUSHALL").query_async(&mut conn).await?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{}/{}", self.addr, self.db)
    }
}
