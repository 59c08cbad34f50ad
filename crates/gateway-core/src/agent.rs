//! Agent abstraction.
//!
//! An agent is a named, swappable backend able to produce chat completions.
//! New backends implement [`Agent`]; the orchestrator only sees the trait.

use crate::context::RequestContext;
use crate::error::GatewayResult;
use crate::request::CompletionRequest;
use crate::response::CompletionResponse;
use crate::streaming::ChunkStream;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Completion backend contract
#[async_trait]
pub trait Agent: Send + Sync {
    /// Stable identifier, also used as the circuit breaker key
    fn name(&self) -> &str;

    /// Run a completion to the end
    async fn execute(
        &self,
        ctx: &RequestContext,
        request: &CompletionRequest,
    ) -> GatewayResult<CompletionResponse>;

    /// Run a completion and yield it incrementally
    ///
    /// On failure the stream carries exactly one error chunk and ends.
    async fn stream(&self, ctx: &RequestContext, request: &CompletionRequest) -> ChunkStream;

    /// Static model catalog, in display order
    fn available_models(&self) -> Vec<ModelInfo>;

    /// Whether the backend looks usable
    async fn is_healthy(&self) -> bool;
}

/// Catalog entry describing one model an agent can serve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Public model id
    pub id: String,
    /// Owning provider
    pub provider: String,
    /// Human readable description
    pub description: String,
    /// Maximum output tokens
    pub max_tokens: u32,
    /// Cost per 1K input tokens (USD)
    pub input_cost_per_1k: f64,
    /// Cost per 1K output tokens (USD)
    pub output_cost_per_1k: f64,
}

impl ModelInfo {
    /// Create a new entry
    #[must_use]
    pub fn new(id: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            provider: provider.into(),
            description: String::new(),
            max_tokens: 4096,
            input_cost_per_1k: 0.0,
            output_cost_per_1k: 0.0,
        }
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set max output tokens
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set pricing per 1K tokens
    #[must_use]
    pub fn with_pricing(mut self, input_per_1k: f64, output_per_1k: f64) -> Self {
        self.input_cost_per_1k = input_per_1k;
        self.output_cost_per_1k = output_per_1k;
        self
    }

    /// Estimated cost of a call in USD
    #[must_use]
    pub fn estimate_cost(&self, input_tokens: u32, output_tokens: u32) -> f64 {
        (f64::from(input_tokens) / 1000.0).mul_add(
            self.input_cost_per_1k,
            f64::from(output_tokens) / 1000.0 * self.output_cost_per_1k,
        )
    }
}
