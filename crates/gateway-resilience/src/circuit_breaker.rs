//! Circuit breaker pattern implementation.
//!
//! The circuit breaker prevents cascading failures by stopping requests
//! to a failing service and allowing it time to recover.
//!
//! State and counters of one breaker sit behind a single mutex, so every
//! transition is totally ordered. The lock is never held across the
//! wrapped operation.

use dashmap::DashMap;
use gateway_core::{GatewayError, GatewayResult};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CircuitState {
    /// Circuit is closed, requests flow normally
    Closed,
    /// Circuit is open, requests are rejected
    Open,
    /// Circuit is half-open, testing if service recovered
    HalfOpen,
}

impl CircuitState {
    /// Wire name of the state
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half-open",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening the circuit
    pub failure_threshold: u32,
    /// Consecutive half-open successes required to close the circuit
    pub success_threshold: u32,
    /// Time to wait before testing the circuit (half-open)
    pub timeout: Duration,
    /// Probes allowed in flight while half-open
    pub max_concurrent_requests: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout: Duration::from_secs(30),
            max_concurrent_requests: 1,
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    failures: u32,
    successes: u32,
    opened_at: Option<Instant>,
    half_open_in_flight: u32,
    // Bumped on every transition; outcomes from an older generation are ignored.
    generation: u64,
    total_requests: u64,
    total_failures: u64,
    rejected: u64,
}

/// Circuit breaker for a single service
pub struct CircuitBreaker {
    service: String,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

/// Admission ticket for one call through the breaker
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    probe: bool,
    settled: bool,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if self.probe && !self.settled {
            // Operation future was dropped mid-flight.
            let mut inner = self.breaker.inner.lock();
            if inner.generation == self.generation {
                inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
            }
        }
    }
}

impl CircuitBreaker {
    /// Create a new circuit breaker
    #[must_use]
    pub fn new(service: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            service: service.into(),
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failures: 0,
                successes: 0,
                opened_at: None,
                half_open_in_flight: 0,
                generation: 0,
                total_requests: 0,
                total_failures: 0,
                rejected: 0,
            }),
        }
    }

    /// Create with default configuration
    #[must_use]
    pub fn with_defaults(service: impl Into<String>) -> Self {
        Self::new(service, CircuitBreakerConfig::default())
    }

    /// Service this breaker guards
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Get the current state
    ///
    /// An open breaker whose timeout has elapsed still reports `Open`
    /// until the next call moves it to `HalfOpen`.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Run `operation` through the breaker
    ///
    /// Fails with `CircuitOpen` without calling `operation` when the
    /// circuit is open, or when half-open with all probe slots taken.
    /// Any error returned by `operation` counts as a failure; the breaker
    /// never retries.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> GatewayResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        let mut permit = self.acquire()?;
        let result = operation().await;
        permit.settled = true;
        self.record(&permit, result.is_ok());
        result
    }

    fn acquire(&self) -> GatewayResult<Permit<'_>> {
        let mut inner = self.inner.lock();

        if inner.state == CircuitState::Open {
            let elapsed = inner
                .opened_at
                .map_or(Duration::ZERO, |opened| opened.elapsed());
            if elapsed < self.config.timeout {
                inner.rejected += 1;
                debug!(service = %self.service, "Circuit breaker rejected call");
                return Err(GatewayError::circuit_open(&self.service));
            }
            self.transition(&mut inner, CircuitState::HalfOpen);
        }

        let probe = inner.state == CircuitState::HalfOpen;
        if probe {
            if inner.half_open_in_flight >= self.config.max_concurrent_requests.max(1) {
                inner.rejected += 1;
                debug!(
                    service = %self.service,
                    in_flight = inner.half_open_in_flight,
                    "Circuit breaker half-open, probe slots exhausted"
                );
                return Err(GatewayError::circuit_open(&self.service));
            }
            inner.half_open_in_flight += 1;
        }

        inner.total_requests += 1;

        Ok(Permit {
            breaker: self,
            generation: inner.generation,
            probe,
            settled: false,
        })
    }

    fn record(&self, permit: &Permit<'_>, success: bool) {
        let mut inner = self.inner.lock();

        if !success {
            inner.total_failures += 1;
        }

        if inner.generation != permit.generation {
            debug!(
                service = %self.service,
                success,
                "Ignoring outcome admitted before the last transition"
            );
            return;
        }

        if permit.probe {
            inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
        }

        match (inner.state, success) {
            (CircuitState::Closed, true) => inner.failures = 0,
            (CircuitState::Closed, false) => {
                inner.failures += 1;
                debug!(
                    service = %self.service,
                    failures = inner.failures,
                    threshold = self.config.failure_threshold,
                    "Circuit breaker recorded failure"
                );
                if inner.failures >= self.config.failure_threshold.max(1) {
                    self.transition(&mut inner, CircuitState::Open);
                }
            }
            (CircuitState::HalfOpen, true) => {
                inner.successes += 1;
                debug!(
                    service = %self.service,
                    successes = inner.successes,
                    threshold = self.config.success_threshold,
                    "Circuit breaker half-open success"
                );
                if inner.successes >= self.config.success_threshold.max(1) {
                    self.transition(&mut inner, CircuitState::Closed);
                }
            }
            (CircuitState::HalfOpen, false) => {
                debug!(service = %self.service, "Circuit breaker half-open failure, reopening");
                self.transition(&mut inner, CircuitState::Open);
            }
            (CircuitState::Open, _) => {}
        }
    }

    fn transition(&self, inner: &mut Inner, to: CircuitState) {
        let from = inner.state;
        inner.state = to;
        inner.failures = 0;
        inner.successes = 0;
        inner.half_open_in_flight = 0;
        inner.generation += 1;

        match to {
            CircuitState::Open => {
                inner.opened_at = Some(Instant::now());
                warn!(service = %self.service, from = %from, "Circuit breaker opened");
            }
            CircuitState::HalfOpen => {
                info!(service = %self.service, "Circuit breaker half-open, testing");
            }
            CircuitState::Closed => {
                inner.opened_at = None;
                info!(service = %self.service, from = %from, "Circuit breaker closed");
            }
        }
    }

    /// Reset the circuit breaker to closed state
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        self.transition(&mut inner, CircuitState::Closed);
    }

    /// Force the circuit open (for testing or manual intervention)
    pub fn force_open(&self) {
        let mut inner = self.inner.lock();
        self.transition(&mut inner, CircuitState::Open);
    }

    /// Get current statistics
    #[must_use]
    pub fn stats(&self) -> CircuitBreakerStats {
        let inner = self.inner.lock();
        CircuitBreakerStats {
            state: inner.state,
            consecutive_failures: inner.failures,
            consecutive_successes: inner.successes,
            half_open_in_flight: inner.half_open_in_flight,
            total_requests: inner.total_requests,
            total_failures: inner.total_failures,
            rejected: inner.rejected,
        }
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("service", &self.service)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Circuit breaker statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerStats {
    /// Current state
    pub state: CircuitState,
    /// Consecutive failures while closed
    pub consecutive_failures: u32,
    /// Consecutive successes while half-open
    pub consecutive_successes: u32,
    /// Probes currently running
    pub half_open_in_flight: u32,
    /// Calls admitted
    pub total_requests: u64,
    /// Admitted calls that failed
    pub total_failures: u64,
    /// Calls rejected without running
    pub rejected: u64,
}

impl CircuitBreakerStats {
    /// Calculate failure rate over admitted calls
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn failure_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.total_failures as f64 / self.total_requests as f64
        }
    }
}

/// One breaker per service name, created lazily with shared configuration
#[derive(Debug, Default)]
pub struct CircuitBreakerRegistry {
    config: CircuitBreakerConfig,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl CircuitBreakerRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            breakers: DashMap::new(),
        }
    }

    /// Breaker for `service`, created on first use
    pub fn breaker(&self, service: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(service) {
            return Arc::clone(existing.value());
        }
        let entry = self
            .breakers
            .entry(service.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(service, self.config.clone())));
        Arc::clone(entry.value())
    }

    /// Existing breaker for `service`
    #[must_use]
    pub fn get(&self, service: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(service).map(|b| Arc::clone(b.value()))
    }

    /// Current state of every breaker, sorted by service name
    #[must_use]
    pub fn snapshot(&self) -> Vec<(String, CircuitState)> {
        let mut states: Vec<_> = self
            .breakers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().state()))
            .collect();
        states.sort_by(|a, b| a.0.cmp(&b.0));
        states
    }

    /// Close every breaker
    pub fn reset_all(&self) {
        for entry in &self.breakers {
            entry.value().reset();
        }
    }

    /// Shared configuration
    #[must_use]
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }
}
