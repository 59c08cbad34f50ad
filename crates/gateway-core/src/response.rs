//! Response types for the gateway.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Completion produced by an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Unique response identifier
    pub id: String,
    /// Generated content
    pub content: String,
    /// Echoed model identifier
    pub model: String,
    /// Prompt tokens (zero when the backend does not report them)
    pub input_tokens: u32,
    /// Completion tokens (zero when the backend does not report them)
    pub output_tokens: u32,
    /// Why generation stopped
    pub finish_reason: FinishReason,
    /// Agent that produced the completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    /// Unix timestamp of creation
    pub created: i64,
}

impl CompletionResponse {
    /// Create a completed (`stop`) response for the given model
    #[must_use]
    pub fn new(model: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: format!("cmpl-{}", uuid::Uuid::new_v4()),
            content: content.into(),
            model: model.into(),
            input_tokens: 0,
            output_tokens: 0,
            finish_reason: FinishReason::Stop,
            agent: None,
            created: Utc::now().timestamp(),
        }
    }

    /// Record the producing agent
    #[must_use]
    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    /// Set token counts
    #[must_use]
    pub fn with_usage(mut self, input_tokens: u32, output_tokens: u32) -> Self {
        self.input_tokens = input_tokens;
        self.output_tokens = output_tokens;
        self
    }

    /// Set the finish reason
    #[must_use]
    pub fn with_finish_reason(mut self, reason: FinishReason) -> Self {
        self.finish_reason = reason;
        self
    }

    /// Total tokens
    #[must_use]
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// Reason the generation finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural stop
    Stop,
    /// Token budget exhausted
    Length,
    /// Content withheld by a filter
    ContentFilter,
    /// Generation aborted by an error
    Error,
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stop => write!(f, "stop"),
            Self::Length => write!(f, "length"),
            Self::ContentFilter => write!(f, "content_filter"),
            Self::Error => write!(f, "error"),
        }
    }
}
