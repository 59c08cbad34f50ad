//! # Gateway Resilience
//!
//! Resilience patterns for the Agent Gateway:
//! - Circuit breaker for preventing cascading failures
//! - Shared key-value store with atomic, self-expiring counters
//! - Fixed-window rate limiting per identity

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod circuit_breaker;
pub mod rate_limiter;
pub mod store;

// Re-export main types
pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRegistry, CircuitBreakerStats, CircuitState,
};
pub use rate_limiter::{RateLimitDecision, RateLimiter, RateLimiterConfig};
pub use store::{CounterValue, KeyValueStore, MemoryStore, RedisStore, StoreError, StoreResult};
