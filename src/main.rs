//! # Agent Gateway
//!
//! Runs chat completions through command-line AI agents with circuit
//! breaking, primary/fallback orchestration and per-identity rate limiting.
//!
//! ## Usage
//!
//! ```bash
//! # Stream one completion from the primary agent
//! agent-gateway "Explain lifetimes in one paragraph"
//!
//! # Pick a model and a configuration file
//! GATEWAY_CONFIG=gateway.yaml agent-gateway --model gemini-pro "Hello"
//!
//! # Show agent health and the model catalog
//! agent-gateway --status
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use futures::StreamExt;
use gateway_agents::{ClaudeAgent, GeminiAgent};
use gateway_config::GatewayConfig;
use gateway_core::{Agent, ChatMessage, CompletionRequest, RequestContext, StreamChunk};
use gateway_resilience::{CircuitBreakerRegistry, KeyValueStore, MemoryStore, RateLimiter, RedisStore};
use gateway_routing::Orchestrator;
use gateway_security::{Encryption, SecurityError, TokenCache};
use gateway_telemetry::init_tracing;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, info, warn};

const SERVICE_NAME: &str = "agent-gateway";
const ENDPOINT: &str = "completions";

/// Agent Gateway - chat completions through CLI agents
#[derive(Parser, Debug)]
#[command(name = "agent-gateway", version, about, long_about = None)]
struct Cli {
    /// Prompt to complete
    prompt: Option<String>,

    /// Model id
    #[arg(short, long, default_value = "claude-3-5-sonnet")]
    model: String,

    /// System prompt
    #[arg(short, long)]
    system: Option<String>,

    /// Caller identity used for rate limiting and token lookup
    #[arg(long, env = "GATEWAY_USER", default_value = "local")]
    user: String,

    /// Organization of the caller
    #[arg(long, env = "GATEWAY_ORG", default_value = "default")]
    org: String,

    /// Print agent health and available models, then exit
    #[arg(long)]
    status: bool,
}

/// Application entry point
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = GatewayConfig::load().context("failed to load configuration")?;
    init_tracing(&config.telemetry.to_tracing_config(SERVICE_NAME))
        .context("failed to initialize tracing")?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Agent Gateway");

    run(cli, &config).await
}

/// Main application logic
async fn run(cli: Cli, config: &GatewayConfig) -> Result<()> {
    let store = connect_store(config).await?;
    let orchestrator = build_orchestrator(config)?;

    if cli.status {
        return print_status(&orchestrator).await;
    }

    let Some(prompt) = cli.prompt else {
        bail!("a prompt is required unless --status is given");
    };

    let limiter = RateLimiter::new(Arc::clone(&store), config.rate_limit.to_limiter_config());
    let decision = limiter.is_allowed(&cli.user, ENDPOINT).await?;
    if !decision.allowed {
        let wait = decision.retry_after().unwrap_or_default();
        bail!("rate limit exceeded for '{}', retry in {}s", cli.user, wait.as_secs());
    }
    debug!(remaining = decision.remaining, "Rate limit check passed");

    let tokens = build_token_cache(config, Arc::clone(&store))?;
    let provider = orchestrator.primary().name().to_string();
    match tokens.get_token(&cli.user, &cli.org, &provider).await {
        Ok(token) => debug!(provider = %provider, expires_at = %token.expires_at(), "Cached OAuth token found"),
        Err(SecurityError::NotFound(_)) => debug!(provider = %provider, "No cached OAuth token"),
        Err(e) => warn!(provider = %provider, error = %e, "Cached OAuth token unusable"),
    }

    let mut builder = CompletionRequest::builder()
        .model(&cli.model)
        .message(ChatMessage::user(prompt))
        .user_id(&cli.user)
        .org_id(&cli.org)
        .stream(true);
    if let Some(system) = cli.system {
        builder = builder.system_prompt(system);
    }
    let request = builder.build()?;

    let ctx = RequestContext::new();
    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling request");
            cancel.cancel();
        }
    });

    let mut chunks = orchestrator.stream(&ctx, &request).await;
    let mut stdout = std::io::stdout().lock();
    while let Some(chunk) = chunks.next().await {
        match chunk {
            StreamChunk::Content(text) => {
                stdout.write_all(text.as_bytes())?;
                stdout.flush()?;
            }
            StreamChunk::Error(e) => {
                writeln!(stdout)?;
                if let Some(stderr) = e.stderr().filter(|s| !s.trim().is_empty()) {
                    warn!(stderr = %stderr.trim(), "Backend reported errors");
                }
                return Err(e).context("completion failed");
            }
        }
    }
    writeln!(stdout)?;

    Ok(())
}

async fn connect_store(config: &GatewayConfig) -> Result<Arc<dyn KeyValueStore>> {
    if let Some(url) = &config.store.redis_url {
        let store = RedisStore::connect(url)
            .await
            .context("failed to connect to Redis")?;
        info!("Using Redis store");
        Ok(Arc::new(store))
    } else {
        info!("Using in-memory store");
        Ok(Arc::new(MemoryStore::new()))
    }
}

fn build_orchestrator(config: &GatewayConfig) -> Result<Orchestrator> {
    let claude: Arc<dyn Agent> =
        Arc::new(ClaudeAgent::new(config.agents.claude.to_agent_config()));
    let gemini: Arc<dyn Agent> =
        Arc::new(GeminiAgent::new(config.agents.gemini.to_agent_config()));

    let breakers = Arc::new(CircuitBreakerRegistry::new(
        config.circuit_breaker.to_breaker_config(),
    ));

    let orchestrator = Orchestrator::builder()
        .agent(claude)
        .agent(gemini)
        .primary(&config.orchestrator.primary_agent)
        .fallback(config.orchestrator.fallback_enabled)
        .breakers(breakers)
        .build()?;

    Ok(orchestrator)
}

fn build_token_cache(config: &GatewayConfig, store: Arc<dyn KeyValueStore>) -> Result<TokenCache> {
    let encryption = if let Some(encryption) = config.token_cache.encryption()? {
        encryption
    } else {
        warn!("No token cache encryption key configured, using an ephemeral key");
        Encryption::new(&*Encryption::generate_key())?
    };

    Ok(TokenCache::new(
        store,
        encryption,
        config.token_cache.to_cache_config(),
    ))
}

async fn print_status(orchestrator: &Orchestrator) -> Result<()> {
    let mut stdout = std::io::stdout().lock();

    writeln!(stdout, "Agents:")?;
    for agent in orchestrator.health().await {
        writeln!(
            stdout,
            "  {:<8} healthy={:<5} circuit={}",
            agent.name, agent.healthy, agent.circuit
        )?;
    }

    writeln!(stdout, "Models:")?;
    for model in orchestrator.list_models() {
        writeln!(stdout, "  {:<20} {:<10} {}", model.id, model.provider, model.description)?;
    }

    Ok(())
}
