//! Fixed-window rate limiting over a shared counter store.
//!
//! Each (identity, endpoint) pair owns one counter. The first request
//! creates it with a one-minute expiry; later requests in the same window
//! increment it. Increment and expiry happen in one atomic store call, so
//! concurrent checks for the same key never race.

use crate::store::KeyValueStore;
use chrono::{DateTime, Utc};
use gateway_core::GatewayResult;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Length of one rate-limit window
pub const WINDOW: Duration = Duration::from_secs(60);

/// Rate limiter configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Requests allowed per window
    pub requests_per_minute: u32,
    /// Burst allowance, accepted but ignored (the window is a plain fixed counter)
    pub burst_size: u32,
    /// Namespace for counter keys
    pub key_prefix: String,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            burst_size: 10,
            key_prefix: "ratelimit".to_string(),
        }
    }
}

/// Outcome of one admission check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Ceiling for the window
    pub limit: u32,
    /// Requests left in the window
    pub remaining: u32,
    /// When the window resets
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    /// Time until the window resets, for denied requests
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        if self.allowed {
            return None;
        }
        let wait = (self.reset_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        Some(wait.max(Duration::from_secs(1)))
    }

    /// Standard rate-limit response headers
    #[must_use]
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("X-RateLimit-Limit", self.limit.to_string()),
            ("X-RateLimit-Remaining", self.remaining.to_string()),
            ("X-RateLimit-Reset", self.reset_at.timestamp().to_string()),
        ];
        if let Some(wait) = self.retry_after() {
            headers.push(("Retry-After", wait.as_secs().to_string()));
        }
        headers
    }
}

/// Per-identity admission gate
pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
    config: RateLimiterConfig,
}

impl RateLimiter {
    /// Create a rate limiter over `store`
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, config: RateLimiterConfig) -> Self {
        Self { store, config }
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    fn key(&self, identity: &str, endpoint: &str) -> String {
        format!("{}:{}:{}", self.config.key_prefix, identity, endpoint)
    }

    /// Count one request for `identity` on `endpoint` and decide admission
    ///
    /// # Errors
    /// Returns `GatewayError::Store` if the counter store fails
    pub async fn is_allowed(&self, identity: &str, endpoint: &str) -> GatewayResult<RateLimitDecision> {
        let key = self.key(identity, endpoint);
        let counter = self.store.increment(&key, WINDOW).await?;

        let limit = self.config.requests_per_minute;
        let count = u32::try_from(counter.count).unwrap_or(u32::MAX);
        let allowed = count <= limit;
        let remaining = if allowed { limit - count } else { 0 };
        let reset_at = Utc::now()
            + chrono::Duration::from_std(counter.ttl).unwrap_or_else(|_| chrono::Duration::zero());

        if allowed {
            debug!(identity = %identity, endpoint = %endpoint, count, remaining, "Rate limit check passed");
        } else {
            warn!(identity = %identity, endpoint = %endpoint, count, limit, "Rate limit exceeded");
        }

        Ok(RateLimitDecision {
            allowed,
            limit,
            remaining,
            reset_at,
        })
    }

    /// Clear the counter for `identity` on `endpoint`
    ///
    /// # Errors
    /// Returns `GatewayError::Store` if the counter store fails
    pub async fn reset_limit(&self, identity: &str, endpoint: &str) -> GatewayResult<()> {
        let key = self.key(identity, endpoint);
        let existed = self.store.delete(&key).await?;
        debug!(identity = %identity, endpoint = %endpoint, existed, "Rate limit reset");
        Ok(())
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("store", &self.store.name())
            .field("config", &self.config)
            .finish()
    }
}
