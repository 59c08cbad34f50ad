//! Per-request execution context.

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Cancellation and deadline carried alongside a request
///
/// Cloning shares the cancellation token, so cancelling any clone cancels
/// every backend call made under it.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Fires when the caller gives up on the request
    pub cancel: CancellationToken,
    /// Absolute deadline, if the caller imposed one
    pub deadline: Option<Instant>,
    /// Request identifier used for log correlation
    pub request_id: String,
}

impl RequestContext {
    /// Create a context with a fresh token and no deadline
    #[must_use]
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: None,
            request_id: Uuid::new_v4().to_string(),
        }
    }

    /// Use an existing cancellation token
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Set a deadline relative to now
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// Set the request id
    #[must_use]
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = id.into();
        self
    }

    /// Time left until the deadline, `None` when unbounded
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// The smaller of `limit` and the remaining deadline
    #[must_use]
    pub fn bound(&self, limit: Duration) -> Duration {
        self.remaining().map_or(limit, |r| r.min(limit))
    }

    /// Whether the caller has cancelled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
