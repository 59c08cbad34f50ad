//! Claude agent backed by the `claude` command-line client.

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
pub const CLAUDE_AGENT_NAME: &str = "claude";

const MODELS: ModelTable = ModelTable::new(&[
    ("claude-3-opus", "opus"),
    ("claude-3-opus-20240229", "opus"),
    ("claude-opus-4", "opus"),
    ("claude-3-sonnet", "sonnet"),
    ("claude-3-5-sonnet", "sonnet"),
    ("claude-3-5-sonnet-20241022", "sonnet"),
    ("claude-sonnet-4", "sonnet"),
    ("claude-3-haiku", "haiku"),
    ("claude-3-5-haiku", "haiku"),
]);

/// Agent that runs completions through the Claude CLI
#[derive(Debug, Clone)]
pub struct ClaudeAgent {
    config: AgentConfig,
}

impl ClaudeAgent {
    /// Create a new Claude agent
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
            "--print".to_string(),
            "--model".to_string(),
            Self::model_flag(&request.model).to_string(),
            "--system-prompt".to_string(),
            prompt.system,
            prompt.user,
        ]);
        Ok(args)
    }

    async fn run(&self, ctx: &RequestContext, request: &CompletionRequest) -> GatewayResult<String> {
        let args = self.build_args(request)?;
        let output = process::run(
            CLAUDE_AGENT_NAME,
            self.config.executable(),
            &args,
            ctx,
            self.config.timeout,
        )
        .await?;

        if !output.stderr.trim().is_empty() {
            debug!(agent = CLAUDE_AGENT_NAME, stderr = %output.stderr.trim(), "Backend diagnostics");
        }

        Ok(output.stdout.trim().to_string())
    }
}

#[async_trait]
impl Agent for ClaudeAgent {
    fn name(&self) -> &str {
        CLAUDE_AGENT_NAME
    }

    async fn execute(
        &self,
        ctx: &RequestContext,
        request: &CompletionRequest,
    ) -> GatewayResult<CompletionResponse> {
        let content = self
            .run(ctx, request)
            .instrument(agent_span!(CLAUDE_AGENT_NAME, request.model))
            .await?;

        Ok(CompletionResponse::new(&request.model, content).with_agent(CLAUDE_AGENT_NAME))
    }

    async fn stream(&self, ctx: &RequestContext, request: &CompletionRequest) -> ChunkStream {
        let result = self
            .execute(ctx, request)
            .await
            .map(|response| response.content);
        chunking::replay(result, chunking::by_char)
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo::new("claude-opus-4", "anthropic")
                .with_description("Most capable Claude model for complex reasoning")
                .with_max_tokens(32_000)
                .with_pricing(0.015, 0.075),
            ModelInfo::new("claude-sonnet-4", "anthropic")
                .with_description("High-performance model balancing speed and intelligence")
                .with_max_tokens(64_000)
                .with_pricing(0.003, 0.015),
            ModelInfo::new("claude-3-5-sonnet", "anthropic")
                .with_description("Claude 3.5 Sonnet")
                .with_max_tokens(8_192)
                .with_pricing(0.003, 0.015),
            ModelInfo::new("claude-3-5-haiku", "anthropic")
                .with_description("Fastest Claude model for lightweight tasks")
                .with_max_tokens(8_192)
                .with_pricing(0.0008, 0.004),
            ModelInfo::new("claude-3-opus", "anthropic")
                .with_description("Claude 3 Opus")
                .with_max_tokens(4_096)
                .with_pricing(0.015, 0.075),
        ]
    }

    async fn is_healthy(&self) -> bool {
        process::is_present(self.config.executable()).await
    }
}
