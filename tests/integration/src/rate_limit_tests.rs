//! Rate limiting tests against each counter store
//!
//! Every scenario runs over the in-memory store, and over Redis as well
//! when `REDIS_URL` is set.

use crate::helpers::*;
use gateway_resilience::{KeyValueStore, RateLimiter, RateLimiterConfig};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn limiter(store: Arc<dyn KeyValueStore>, limit: u32, prefix: &str) -> RateLimiter {
    RateLimiter::new(
        store,
        RateLimiterConfig {
            requests_per_minute: limit,
            key_prefix: prefix.to_string(),
            ..Default::default()
        },
    )
}

async fn check_budget_and_reset(store: Arc<dyn KeyValueStore>) {
    let limiter = limiter(store, 10, &unique_prefix("budget"));

    for expected in (0..10).rev() {
        let decision = limiter.is_allowed("alice", "completions").await.expect("check");
        assert!(decision.allowed);
        assert_eq!(decision.remaining, expected);
        assert_eq!(decision.limit, 10);
    }

    let denied = limiter.is_allowed("alice", "completions").await.expect("check");
    assert!(!denied.allowed);
    assert_eq!(denied.remaining, 0);
    let retry = denied.retry_after().expect("retry hint when denied");
    assert!(retry >= Duration::from_secs(1) && retry <= Duration::from_secs(60));

    limiter.reset_limit("alice", "completions").await.expect("reset");
    let decision = limiter.is_allowed("alice", "completions").await.expect("check");
    assert!(decision.allowed);
    assert_eq!(decision.remaining, 9);
}

async fn check_isolation(store: Arc<dyn KeyValueStore>) {
    let limiter = limiter(store, 1, &unique_prefix("isolation"));

    assert!(limiter.is_allowed("alice", "completions").await.expect("check").allowed);
    assert!(!limiter.is_allowed("alice", "completions").await.expect("check").allowed);

    assert!(limiter.is_allowed("bob", "completions").await.expect("check").allowed);
    assert!(limiter.is_allowed("alice", "models").await.expect("check").allowed);
}

async fn check_concurrency(store: Arc<dyn KeyValueStore>) {
    let limiter = Arc::new(limiter(store, 20, &unique_prefix("concurrency")));

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.is_allowed("carol", "completions").await })
        })
        .collect();

    let mut allowed = 0;
    for handle in handles {
        if handle.await.expect("task").expect("check").allowed {
            allowed += 1;
        }
    }
    assert_eq!(allowed, 20);
}

#[tokio::test]
async fn test_budget_and_reset_memory() {
    init_tracing();
    check_budget_and_reset(memory_store()).await;
}

#[tokio::test]
async fn test_isolation_memory() {
    check_isolation(memory_store()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_memory() {
    check_concurrency(memory_store()).await;
}

#[tokio::test]
async fn test_denied_headers_include_retry_after() {
    let limiter = limiter(memory_store(), 1, "headers");
    limiter.is_allowed("dave", "completions").await.expect("check");
    let denied = limiter.is_allowed("dave", "completions").await.expect("check");

    let headers = denied.headers();
    let names: Vec<_> = headers.iter().map(|(name, _)| *name).collect();
    assert_eq!(
        names,
        vec![
            "X-RateLimit-Limit",
            "X-RateLimit-Remaining",
            "X-RateLimit-Reset",
            "Retry-After"
        ]
    );
    assert_eq!(headers[1].1, "0");
}

#[tokio::test(start_paused = true)]
async fn test_window_expiry_restores_budget() {
    let limiter = limiter(memory_store(), 1, "expiry");

    assert!(limiter.is_allowed("erin", "completions").await.expect("check").allowed);
    assert!(!limiter.is_allowed("erin", "completions").await.expect("check").allowed);

    tokio::time::advance(Duration::from_secs(61)).await;

    let decision = limiter.is_allowed("erin", "completions").await.expect("check");
    assert!(decision.allowed);
    assert_eq!(decision.remaining, 0);
}

#[tokio::test]
async fn test_rate_limiting_over_redis() {
    let Some(store) = redis_store().await else {
        return;
    };
    assert!(store.is_distributed());

    check_budget_and_reset(Arc::clone(&store)).await;
    check_isolation(Arc::clone(&store)).await;
    check_concurrency(store).await;
}
