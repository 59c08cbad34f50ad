//! Test helper utilities for integration tests

use gateway_resilience::{KeyValueStore, MemoryStore, RedisStore};
use gateway_security::{Encryption, TokenCache, TokenCacheConfig};
use once_cell::sync::Lazy;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Initialize tracing for tests (only once)
static TRACING: Lazy<()> = Lazy::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
});

/// Initialize tracing for tests
pub fn init_tracing() {
    Lazy::force(&TRACING);
}

/// Fresh in-memory store
pub fn memory_store() -> Arc<dyn KeyValueStore> {
    Arc::new(MemoryStore::new())
}

/// Redis store from `REDIS_URL`, or `None` when the variable is unset
pub async fn redis_store() -> Option<Arc<dyn KeyValueStore>> {
    let url = std::env::var("REDIS_URL").ok()?;
    let store = RedisStore::connect(&url)
        .await
        .expect("REDIS_URL is set but Redis is unreachable");
    Some(Arc::new(store))
}

/// Token cache with a random key over `store`
pub fn token_cache(store: Arc<dyn KeyValueStore>) -> TokenCache {
    let key = Encryption::generate_key();
    let encryption = Encryption::new(&*key).expect("32-byte key");
    TokenCache::new(store, encryption, TokenCacheConfig::default())
}

/// Unique key namespace so tests sharing a Redis instance do not collide
pub fn unique_prefix(name: &str) -> String {
    format!("test:{name}:{}", chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

/// Wait for a condition to be true with timeout
pub async fn wait_for<F, Fut>(condition: F, timeout: Duration) -> bool
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}
