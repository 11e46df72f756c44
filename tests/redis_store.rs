#![allow(clippy::unwrap_used)]
//! Tests against live Redis-compatible servers
//!
//! Ignored by default. Run with two scratch servers (both are flushed):
//! ```text
//! REDISCOPY_TEST_SRC=127.0.0.1:6379 REDISCOPY_TEST_DEST=127.0.0.1:6380 \
//!     cargo test --test redis_store -- --ignored
//! ```

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use rediscopy::config::EndpointConfig;
use rediscopy::replication::{ReplicationOptions, Replicator};
use rediscopy::store::{Key, RedisStore, Store, Ttl};
use rediscopy::StoreError;

fn endpoint(var: &str) -> EndpointConfig {
    EndpointConfig {
        addr: std::env::var(var).unwrap_or_else(|_| panic!("{} must be set", var)),
        ..Default::default()
    }
}

async fn seed(store: &RedisStore) {
    let mut conn = redis::Client::open(format!("redis://{}", store.describe()))
        .unwrap()
        .get_multiplexed_async_connection()
        .await
        .unwrap();
    let _: () = redis::cmd("FLUSHALL").query_async(&mut conn).await.unwrap();
    let _: () = redis::cmd("SET")
        .arg("a")
        .arg("1")
        .arg("EX")
        .arg(10)
        .query_async(&mut conn)
        .await
        .unwrap();
    let _: () = redis::cmd("SET").arg("b").arg("2").query_async(&mut conn).await.unwrap();
    let _: () = redis::cmd("RPUSH")
        .arg("list")
        .arg("x")
        .arg("y")
        .query_async(&mut conn)
        .await
        .unwrap();
    let _: () = redis::cmd("HSET")
        .arg("hash")
        .arg("field")
        .arg("value")
        .query_async(&mut conn)
        .await
        .unwrap();
}

#[tokio::test]
#[ignore] // Requires running servers
async fn test_missing_key_semantics() {
    let store = RedisStore::connect(&endpoint("REDISCOPY_TEST_SRC")).await.unwrap();
    let key = Key::from("rediscopy:definitely-missing");

    assert_eq!(store.dump(&key).await.unwrap_err(), StoreError::NotFound);
    assert_eq!(
        store.remaining_ttl(&key).await.unwrap_err(),
        StoreError::NotFound
    );
}

#[tokio::test]
#[ignore] // Requires running servers
async fn test_copy_between_servers() {
    let source = RedisStore::connect(&endpoint("REDISCOPY_TEST_SRC")).await.unwrap();
    let dest = RedisStore::connect(&endpoint("REDISCOPY_TEST_DEST")).await.unwrap();
    seed(&source).await;

    let options = ReplicationOptions {
        concurrency: NonZeroUsize::new(2).unwrap(),
        ..Default::default()
    };
    let report = Replicator::new(Arc::new(source.clone()), Arc::new(dest.clone()), options)
        .run()
        .await
        .unwrap();

    assert_eq!(report.attempted(), 4);
    assert_eq!(report.counts.copied, 4);

    let mut keys = dest.scan_keys("*", 100).await.unwrap();
    keys.sort();
    assert_eq!(
        keys,
        vec![Key::from("a"), Key::from("b"), Key::from("hash"), Key::from("list")]
    );

    assert_eq!(dest.remaining_ttl(&Key::from("b")).await.unwrap(), Ttl::Persistent);
    match dest.remaining_ttl(&Key::from("a")).await.unwrap() {
        Ttl::Expires(left) => assert!(left <= Duration::from_secs(10)),
        Ttl::Persistent => panic!("ttl of a was lost"),
    }
    for key in ["a", "b", "hash", "list"] {
        let key = Key::from(key);
        assert_eq!(
            dest.dump(&key).await.unwrap(),
            source.dump(&key).await.unwrap()
        );
    }
}
