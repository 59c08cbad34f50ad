//! Error types for the gateway.
//!
//! `GatewayError` is the single error type carried across agents, circuit
//! breakers, the orchestrator and the rate limiter.

use std::time::Duration;
use thiserror::Error;

/// Result alias used throughout the gateway crates
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Maximum number of stderr bytes kept on a backend failure
const MAX_STDERR_LEN: usize = 4096;

/// Gateway error type
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The request cannot be served as constructed
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// What is wrong with the request
        message: String,
        /// Offending field, if any
        field: Option<String>,
    },

    /// The backend process could not be started or exited unsuccessfully
    #[error("Backend execution failed for agent '{agent}': {message}")]
    BackendExecutionFailed {
        /// Agent whose backend failed
        agent: String,
        /// Failure description
        message: String,
        /// Process exit code, if the process ran to completion
        exit_code: Option<i32>,
        /// Captured standard error (truncated)
        stderr: String,
    },

    /// The backend did not finish within its time budget
    #[error("Agent '{agent}' timed out after {timeout:?}")]
    Timeout {
        /// Agent that timed out
        agent: String,
        /// Budget that was exceeded
        timeout: Duration,
    },

    /// The caller cancelled the request while the backend was running
    #[error("Request to agent '{agent}' was cancelled")]
    Cancelled {
        /// Agent that was running
        agent: String,
    },

    /// Gateway misconfiguration (unknown primary agent, bad key, ...)
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message
        message: String,
    },

    /// The circuit breaker for a service rejected the call
    #[error("Circuit breaker open for service '{service}'")]
    CircuitOpen {
        /// Service whose breaker is open
        service: String,
    },

    /// Every attempted agent failed
    #[error("All agents failed (attempted: {}): {last}", attempted.join(", "))]
    AgentsExhausted {
        /// Agents attempted, in order
        attempted: Vec<String>,
        /// Error from the final attempt
        #[source]
        last: Box<GatewayError>,
    },

    /// Shared store (counters, cache) failure
    #[error("Store error: {message}")]
    Store {
        /// Error message
        message: String,
    },

    /// Unexpected internal failure
    #[error("Internal error: {message}")]
    Internal {
        /// Error message
        message: String,
    },
}

impl GatewayError {
    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>, field: Option<&str>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
            field: field.map(ToString::to_string),
        }
    }

    /// Create a backend execution error, truncating the captured stderr
    pub fn backend(
        agent: impl Into<String>,
        message: impl Into<String>,
        exit_code: Option<i32>,
        stderr: impl Into<String>,
    ) -> Self {
        let mut stderr = stderr.into();
        if stderr.len() > MAX_STDERR_LEN {
            let mut cut = MAX_STDERR_LEN;
            while !stderr.is_char_boundary(cut) {
                cut -= 1;
            }
            stderr.truncate(cut);
        }
        Self::BackendExecutionFailed {
            agent: agent.into(),
            message: message.into(),
            exit_code,
            stderr,
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a circuit-open error
    pub fn circuit_open(service: impl Into<String>) -> Self {
        Self::CircuitOpen {
            service: service.into(),
        }
    }

    /// Create a store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the error originated in a backend (process failure or timeout)
    #[must_use]
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self.root_cause(),
            Self::BackendExecutionFailed { .. } | Self::Timeout { .. }
        )
    }

    /// Whether the error is a circuit breaker fast-fail
    #[must_use]
    pub fn is_circuit_open(&self) -> bool {
        matches!(self.root_cause(), Self::CircuitOpen { .. })
    }

    /// Whether the error is caused by caller cancellation
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root_cause(), Self::Cancelled { .. })
    }

    /// Strip orchestration annotations and return the underlying error
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::AgentsExhausted { last, .. } => last.root_cause(),
            other => other,
        }
    }

    /// Agents attempted before this error was produced, if recorded
    #[must_use]
    pub fn attempted_agents(&self) -> &[String] {
        match self {
            Self::AgentsExhausted { attempted, .. } => attempted,
            _ => &[],
        }
    }

    /// Captured backend stderr, if any
    #[must_use]
    pub fn stderr(&self) -> Option<&str> {
        match self.root_cause() {
            Self::BackendExecutionFailed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }

    /// Stable error type string for logs and API responses
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request_error",
            Self::BackendExecutionFailed { .. } => "backend_error",
            Self::Timeout { .. } => "timeout_error",
            Self::Cancelled { .. } => "cancelled",
            Self::Configuration { .. } => "configuration_error",
            Self::CircuitOpen { .. } => "circuit_open",
            Self::AgentsExhausted { last, .. } => last.error_type(),
            Self::Store { .. } => "store_error",
            Self::Internal { .. } => "internal_error",
        }
    }
}
