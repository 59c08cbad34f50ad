//! Gemini agent backed by the `gemini` command-line client.
//!
//! The Gemini CLI has no separate system prompt flag, so the system prompt
//! is prepended to the user message.

use crate::chunking;
use crate::config::AgentConfig;
use crate::models::ModelTable;
use crate::process;
use crate::prompt::Prompt;
use async_trait::async_trait;
use gateway_core::{
    Agent, ChunkStream, CompletionRequest, CompletionResponse, GatewayResult, ModelInfo,
    RequestContext,
};
use gateway_telemetry::agent_span;
use tracing::{debug, Instrument};

/// Agent name
pub const GEMINI_AGENT_NAME: &str = "gemini";

const MODELS: ModelTable = ModelTable::new(&[
    ("gemini-pro", "gemini-2.5-pro"),
    ("gemini-flash", "gemini-2.5-flash"),
    ("gemini-flash-lite", "gemini-2.5-flash-lite"),
    ("gemini-1.5-pro-latest", "gemini-1.5-pro"),
    ("gemini-1.5-flash-latest", "gemini-1.5-flash"),
]);

/// Agent that runs completions through the Gemini CLI
#[derive(Debug, Clone)]
pub struct GeminiAgent {
    config: AgentConfig,
}

impl GeminiAgent {
    /// Create a new Gemini agent
    #[must_use]
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Backend flag for a public model id
    #[must_use]
    pub fn model_flag(model: &str) -> &str {
        MODELS.translate(model)
    }

    /// Command-line arguments for a request
    ///
    /// # Errors
    /// Returns `InvalidRequest` if the request has no user message
    pub fn build_args(&self, request: &CompletionRequest) -> GatewayResult<Vec<String>> {
        let prompt = Prompt::from_request(request)?;

        let mut args = self.config.extra_args.clone();
        args.extend([
            "--model".to_string(),
            Self::model_flag(&request.model).to_string(),
            "--prompt".to_string(),
            prompt.combined(),
        ]);
        Ok(args)
    }

    async fn run(&self, ctx: &RequestContext, request: &CompletionRequest) -> GatewayResult<String> {
        let args = self.build_args(request)?;
        let output = process::run(
            GEMINI_AGENT_NAME,
            self.config.executable(),
            &args,
            ctx,
            self.config.timeout,
        )
        .await?;

        if !output.stderr.trim().is_empty() {
            debug!(agent = GEMINI_AGENT_NAME, stderr = %output.stderr.trim(), "Backend diagnostics");
        }

        Ok(output.stdout.trim().to_string())
    }
}

#[async_trait]
impl Agent for GeminiAgent {
    fn name(&self) -> &str {
        GEMINI_AGENT_NAME
    }

    async fn execute(
        &self,
        ctx: &RequestContext,
        request: &CompletionRequest,
    ) -> GatewayResult<CompletionResponse> {
        let content = self
            .run(ctx, request)
            .instrument(agent_span!(GEMINI_AGENT_NAME, request.model))
            .await?;

        Ok(CompletionResponse::new(&request.model, content).with_agent(GEMINI_AGENT_NAME))
    }

    async fn stream(&self, ctx: &RequestContext, request: &CompletionRequest) -> ChunkStream {
        let result = self
            .execute(ctx, request)
            .await
            .map(|response| response.content);
        chunking::replay(result, chunking::by_word)
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo::new("gemini-2.5-pro", "google")
                .with_description("Most capable Gemini model with long context")
                .with_max_tokens(65_536)
                .with_pricing(0.00125, 0.01),
            ModelInfo::new("gemini-2.5-flash", "google")
                .with_description("Fast, cost-efficient Gemini model")
                .with_max_tokens(65_536)
                .with_pricing(0.0003, 0.0025),
            ModelInfo::new("gemini-1.5-pro", "google")
                .with_description("Gemini 1.5 Pro")
                .with_max_tokens(8_192)
                .with_pricing(0.00125, 0.005),
            ModelInfo::new("gemini-1.5-flash", "google")
                .with_description("Gemini 1.5 Flash")
                .with_max_tokens(8_192)
                .with_pricing(0.000_075, 0.0003),
        ]
    }

    async fn is_healthy(&self) -> bool {
        process::is_present(self.config.executable()).await
    }
}
