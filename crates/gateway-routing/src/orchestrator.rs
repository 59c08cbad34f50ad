//! Primary/fallback orchestration across agents.
//!
//! A request goes to the primary agent unless the primary looks unhealthy
//! and fallback is enabled, in which case it goes straight to the
//! secondary. A failed first attempt is retried once against the other
//! agent. Every attempt runs through the agent's circuit breaker, so an
//! open breaker fails fast without touching the backend.

use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use gateway_core::{
    Agent, ChunkStream, CompletionRequest, CompletionResponse, GatewayError, GatewayResult,
    ModelInfo, RequestContext, StreamChunk,
};
use gateway_resilience::{CircuitBreaker, CircuitBreakerRegistry, CircuitState};
use gateway_telemetry::breaker_span;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

/// Health of one agent as seen by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentHealth {
    /// Agent name
    pub name: String,
    /// Result of the agent's own health check
    pub healthy: bool,
    /// State of the agent's circuit breaker
    pub circuit: CircuitState,
}

/// Builder for [`Orchestrator`]
#[derive(Default)]
pub struct OrchestratorBuilder {
    agents: Vec<Arc<dyn Agent>>,
    primary: Option<String>,
    fallback_enabled: bool,
    breakers: Option<Arc<CircuitBreakerRegistry>>,
}

impl OrchestratorBuilder {
    /// Add an agent; order decides which agent is the secondary
    #[must_use]
    pub fn agent(mut self, agent: Arc<dyn Agent>) -> Self {
        self.agents.push(agent);
        self
    }

    /// Add several agents
    #[must_use]
    pub fn agents(mut self, agents: impl IntoIterator<Item = Arc<dyn Agent>>) -> Self {
        self.agents.extend(agents);
        self
    }

    /// Name of the primary agent
    #[must_use]
    pub fn primary(mut self, name: impl Into<String>) -> Self {
        self.primary = Some(name.into());
        self
    }

    /// Enable or disable fallback to the secondary agent
    #[must_use]
    pub fn fallback(mut self, enabled: bool) -> Self {
        self.fallback_enabled = enabled;
        self
    }

    /// Share a breaker registry instead of creating a private one
    #[must_use]
    pub fn breakers(mut self, registry: Arc<CircuitBreakerRegistry>) -> Self {
        self.breakers = Some(registry);
        self
    }

    /// Build the orchestrator
    ///
    /// # Errors
    /// Returns `Configuration` if no agents were added, agent names collide,
    /// or the primary agent is not among the agents
    pub fn build(self) -> GatewayResult<Orchestrator> {
        if self.agents.is_empty() {
            return Err(GatewayError::configuration("no agents configured"));
        }

        let mut seen = HashSet::new();
        for agent in &self.agents {
            if !seen.insert(agent.name()) {
                return Err(GatewayError::configuration(format!(
                    "duplicate agent name '{}'",
                    agent.name()
                )));
            }
        }

        let primary_name = self
            .primary
            .ok_or_else(|| GatewayError::configuration("no primary agent configured"))?;
        let primary = self
            .agents
            .iter()
            .position(|a| a.name() == primary_name)
            .ok_or_else(|| {
                GatewayError::configuration(format!(
                    "primary agent '{primary_name}' is not configured"
                ))
            })?;

        let breakers = self.breakers.unwrap_or_default();
        for agent in &self.agents {
            breakers.breaker(agent.name());
        }

        info!(
            primary = %primary_name,
            agents = self.agents.len(),
            fallback = self.fallback_enabled,
            "Orchestrator ready"
        );

        Ok(Orchestrator {
            agents: self.agents,
            primary,
            fallback_enabled: self.fallback_enabled,
            breakers,
        })
    }
}

/// Dispatches completions to agents with circuit breaking and fallback
pub struct Orchestrator {
    agents: Vec<Arc<dyn Agent>>,
    primary: usize,
    fallback_enabled: bool,
    breakers: Arc<CircuitBreakerRegistry>,
}

impl Orchestrator {
    /// Create a builder
    #[must_use]
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    /// The primary agent
    #[must_use]
    pub fn primary(&self) -> &dyn Agent {
        self.agents[self.primary].as_ref()
    }

    /// First agent after the primary in configuration order
    #[must_use]
    pub fn secondary(&self) -> Option<&dyn Agent> {
        self.agents
            .iter()
            .enumerate()
            .find(|(i, _)| *i != self.primary)
            .map(|(_, agent)| agent.as_ref())
    }

    /// Whether fallback is enabled
    #[must_use]
    pub fn fallback_enabled(&self) -> bool {
        self.fallback_enabled
    }

    /// Breaker registry shared by all agents
    #[must_use]
    pub fn breakers(&self) -> &Arc<CircuitBreakerRegistry> {
        &self.breakers
    }

    /// Run a completion to the end
    ///
    /// # Errors
    /// Returns `InvalidRequest` for malformed requests, otherwise
    /// `AgentsExhausted` wrapping the last attempt's error
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        request: &CompletionRequest,
    ) -> GatewayResult<CompletionResponse> {
        self.dispatch(ctx, request, move |agent| agent.execute(ctx, request))
            .await
    }

    /// Run a completion and yield it incrementally
    ///
    /// The first chunk is awaited inside the breaker, so a backend that
    /// fails before producing output counts as a failure and can fall
    /// back. A terminal failure is a single error chunk.
    pub async fn stream(&self, ctx: &RequestContext, request: &CompletionRequest) -> ChunkStream {
        let result = self
            .dispatch(ctx, request, move |agent| {
                async move {
                    let mut chunks = agent.stream(ctx, request).await;
                    match chunks.next().await {
                        Some(StreamChunk::Error(err)) => Err(err),
                        Some(first) => Ok(stream::once(async move { first }).chain(chunks).boxed()),
                        None => Ok(chunks),
                    }
                }
                .boxed()
            })
            .await;

        match result {
            Ok(chunks) => chunks,
            Err(err) => stream::once(async move { StreamChunk::Error(err) }).boxed(),
        }
    }

    /// Every agent's catalog in agent order, first occurrence of an id wins
    #[must_use]
    pub fn list_models(&self) -> Vec<ModelInfo> {
        let mut seen = HashSet::new();
        self.agents
            .iter()
            .flat_map(|agent| agent.available_models())
            .filter(|model| seen.insert(model.id.clone()))
            .collect()
    }

    /// Health check and breaker state of every agent
    pub async fn health(&self) -> Vec<AgentHealth> {
        let mut report = Vec::with_capacity(self.agents.len());
        for agent in &self.agents {
            report.push(AgentHealth {
                name: agent.name().to_string(),
                healthy: agent.is_healthy().await,
                circuit: self.breaker(agent.as_ref()).state(),
            });
        }
        report
    }

    fn breaker(&self, agent: &dyn Agent) -> Arc<CircuitBreaker> {
        self.breakers.breaker(agent.name())
    }

    async fn plan(&self) -> Vec<&dyn Agent> {
        let primary = self.primary();
        let Some(secondary) = self.secondary().filter(|_| self.fallback_enabled) else {
            return vec![primary];
        };

        if primary.is_healthy().await {
            vec![primary, secondary]
        } else {
            warn!(
                primary = %primary.name(),
                secondary = %secondary.name(),
                "Primary agent unhealthy, using secondary"
            );
            vec![secondary]
        }
    }

    async fn dispatch<'a, T, F>(
        &'a self,
        ctx: &RequestContext,
        request: &CompletionRequest,
        call: F,
    ) -> GatewayResult<T>
    where
        F: Fn(&'a dyn Agent) -> BoxFuture<'a, GatewayResult<T>>,
    {
        request.validate()?;
        if request.last_user_message().is_none() {
            return Err(GatewayError::invalid_request(
                "request contains no user message",
                Some("messages"),
            ));
        }

        let attempts = self.plan().await;
        let mut attempted = Vec::with_capacity(attempts.len());
        let mut last_error = None;

        for agent in attempts {
            let name = agent.name();
            attempted.push(name.to_string());

            debug!(
                agent = %name,
                request_id = %ctx.request_id,
                model = %request.model,
                attempt = attempted.len(),
                "Dispatching to agent"
            );

            let result = self
                .breaker(agent)
                .execute(|| call(agent))
                .instrument(breaker_span!(name))
                .await;

            match result {
                Ok(value) => {
                    if attempted.len() > 1 {
                        info!(agent = %name, "Fallback agent succeeded");
                    }
                    return Ok(value);
                }
                Err(err) => {
                    warn!(agent = %name, error = %err, "Agent attempt failed");
                    let stop = err.is_cancelled()
                        || matches!(err, GatewayError::InvalidRequest { .. });
                    last_error = Some(err);
                    if stop {
                        break;
                    }
                }
            }
        }

        let last = last_error.unwrap_or_else(|| GatewayError::internal("no agent was attempted"));
        Err(GatewayError::AgentsExhausted {
            attempted,
            last: Box::new(last),
        })
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field(
                "agents",
                &self.agents.iter().map(|a| a.name()).collect::<Vec<_>>(),
            )
            .field("primary", &self.primary().name())
            .field("fallback_enabled", &self.fallback_enabled)
            .finish_non_exhaustive()
    }
}
