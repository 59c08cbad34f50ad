//! Key-value store contract tests

use crate::helpers::*;
use gateway_resilience::{KeyValueStore, MemoryStore};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

async fn check_set_get_delete(store: &dyn KeyValueStore, prefix: &str) {
    let key = format!("{prefix}:value");

    assert_eq!(store.get(&key).await.expect("get"), None);

    store
        .set(&key, b"payload".to_vec(), Duration::from_secs(60))
        .await
        .expect("set");
    assert_eq!(store.get(&key).await.expect("get"), Some(b"payload".to_vec()));

    store
        .set(&key, b"replaced".to_vec(), Duration::from_secs(60))
        .await
        .expect("set");
    assert_eq!(store.get(&key).await.expect("get"), Some(b"replaced".to_vec()));

    assert!(store.delete(&key).await.expect("delete"));
    assert!(!store.delete(&key).await.expect("delete"));
    assert_eq!(store.get(&key).await.expect("get"), None);
}

async fn check_increment(store: &dyn KeyValueStore, prefix: &str) {
    let key = format!("{prefix}:counter");
    let window = Duration::from_secs(60);

    let first = store.increment(&key, window).await.expect("increment");
    assert_eq!(first.count, 1);
    assert!(first.ttl <= window && first.ttl > Duration::from_secs(50));

    let second = store.increment(&key, window).await.expect("increment");
    assert_eq!(second.count, 2);
    assert!(second.ttl <= first.ttl);

    store.delete(&key).await.expect("delete");
}

#[tokio::test]
async fn test_memory_set_get_delete() {
    init_tracing();
    let store = memory_store();
    check_set_get_delete(store.as_ref(), "memory").await;
}

#[tokio::test]
async fn test_memory_increment() {
    let store = memory_store();
    check_increment(store.as_ref(), "memory").await;
}

#[tokio::test(start_paused = true)]
async fn test_memory_entries_expire() {
    let store = MemoryStore::new();
    store
        .set("session", b"data".to_vec(), Duration::from_secs(5))
        .await
        .expect("set");
    store
        .set("pinned", b"data".to_vec(), Duration::ZERO)
        .await
        .expect("set");

    tokio::time::advance(Duration::from_secs(6)).await;

    assert_eq!(store.get("session").await.expect("get"), None);
    assert!(store.get("pinned").await.expect("get").is_some());
}

#[tokio::test(start_paused = true)]
async fn test_memory_increment_expiry_set_on_create_only() {
    let store = MemoryStore::new();
    let window = Duration::from_secs(60);

    store.increment("hits", window).await.expect("increment");
    tokio::time::advance(Duration::from_secs(40)).await;

    let later = store.increment("hits", window).await.expect("increment");
    assert_eq!(later.count, 2);
    assert_eq!(later.ttl, Duration::from_secs(20));

    tokio::time::advance(Duration::from_secs(21)).await;
    let fresh = store.increment("hits", window).await.expect("increment");
    assert_eq!(fresh.count, 1);
    assert_eq!(fresh.ttl, window);
}

#[tokio::test]
async fn test_memory_store_identity() {
    let store: Arc<dyn KeyValueStore> = memory_store();

    assert_eq!(store.name(), "memory");
    assert!(!store.is_distributed());
    store.health_check().await.expect("healthy");
}

#[tokio::test]
async fn test_redis_store_contract() {
    let Some(store) = redis_store().await else {
        return;
    };
    let prefix = unique_prefix("store");

    assert!(store.is_distributed());
    store.health_check().await.expect("healthy");
    check_set_get_delete(store.as_ref(), &prefix).await;
    check_increment(store.as_ref(), &prefix).await;
}
