//! Orchestration tests over real agents and fake backends

use crate::fixtures::*;
use crate::helpers::*;
use futures::StreamExt;
use gateway_agents::{AgentConfig, ClaudeAgent, GeminiAgent};
use gateway_core::{Agent, RequestContext, StreamChunk};
use gateway_resilience::{CircuitBreakerConfig, CircuitBreakerRegistry, CircuitState};
use gateway_routing::Orchestrator;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn orchestrator(claude: AgentConfig, gemini: AgentConfig, fallback: bool) -> Orchestrator {
    orchestrator_with_breakers(claude, gemini, fallback, CircuitBreakerConfig::default())
}

fn orchestrator_with_breakers(
    claude: AgentConfig,
    gemini: AgentConfig,
    fallback: bool,
    breakers: CircuitBreakerConfig,
) -> Orchestrator {
    let claude: Arc<dyn Agent> = Arc::new(ClaudeAgent::new(claude));
    let gemini: Arc<dyn Agent> = Arc::new(GeminiAgent::new(gemini));
    Orchestrator::builder()
        .agents([claude, gemini])
        .primary("claude")
        .fallback(fallback)
        .breakers(Arc::new(CircuitBreakerRegistry::new(breakers)))
        .build()
        .expect("valid orchestrator")
}

#[tokio::test]
async fn test_primary_serves_request() {
    init_tracing();
    let claude = FakeBackend::replying("from claude");
    let gemini = FakeBackend::replying("from gemini");
    let orchestrator = orchestrator(claude.config(), gemini.config(), true);

    let response = orchestrator
        .execute(&RequestContext::new(), &simple_request("claude-3-5-sonnet"))
        .await
        .expect("response");

    assert_eq!(response.content, "from claude");
    assert_eq!(response.agent.as_deref(), Some("claude"));
    assert_eq!(claude.invocations(), 1);
    assert_eq!(gemini.invocations(), 0);
}

#[tokio::test]
async fn test_unhealthy_primary_goes_straight_to_secondary() {
    let gemini = FakeBackend::replying("from gemini");
    let orchestrator = orchestrator(missing_backend(), gemini.config(), true);

    let response = orchestrator
        .execute(&RequestContext::new(), &simple_request("gemini-pro"))
        .await
        .expect("response");

    assert_eq!(response.content, "from gemini");
    assert_eq!(response.agent.as_deref(), Some("gemini"));
    assert_eq!(gemini.invocations(), 1);
}

#[tokio::test]
async fn test_primary_failure_falls_back_once() {
    let claude = FakeBackend::failing(1, "quota exceeded");
    let gemini = FakeBackend::replying("from gemini");
    let orchestrator = orchestrator(claude.config(), gemini.config(), true);

    let response = orchestrator
        .execute(&RequestContext::new(), &simple_request("claude-3-opus"))
        .await
        .expect("response");

    assert_eq!(response.content, "from gemini");
    assert_eq!(claude.invocations(), 1);
    assert_eq!(gemini.invocations(), 1);
    assert_eq!(
        orchestrator.breakers().breaker("claude").stats().total_failures,
        1
    );
}

#[tokio::test]
async fn test_all_agents_failing_reports_attempts() {
    let claude = FakeBackend::failing(1, "claude down");
    let gemini = FakeBackend::failing(3, "gemini down");
    let orchestrator = orchestrator(claude.config(), gemini.config(), true);

    let err = orchestrator
        .execute(&RequestContext::new(), &simple_request("claude-3-opus"))
        .await
        .expect_err("should fail");

    assert_eq!(err.attempted_agents(), ["claude", "gemini"]);
    assert!(err.is_backend_failure());
    assert!(err.stderr().is_some_and(|s| s.contains("gemini down")));
}

#[tokio::test]
async fn test_breaker_opens_and_fast_fails() {
    let claude = FakeBackend::failing(1, "broken");
    let gemini = FakeBackend::replying("unused");
    let orchestrator = orchestrator_with_breakers(
        claude.config(),
        gemini.config(),
        false,
        CircuitBreakerConfig {
            failure_threshold: 2,
            timeout: Duration::from_secs(60),
            ..Default::default()
        },
    );
    let request = simple_request("claude-3-opus");

    for _ in 0..2 {
        let err = orchestrator
            .execute(&RequestContext::new(), &request)
            .await
            .expect_err("backend fails");
        assert!(err.is_backend_failure());
    }
    assert_eq!(
        orchestrator.breakers().breaker("claude").state(),
        CircuitState::Open
    );

    let err = orchestrator
        .execute(&RequestContext::new(), &request)
        .await
        .expect_err("circuit open");
    assert!(err.is_circuit_open());
    assert_eq!(claude.invocations(), 2);
    assert_eq!(gemini.invocations(), 0);
}

#[tokio::test]
async fn test_stream_through_fallback() {
    let claude = FakeBackend::failing(1, "down");
    let gemini = FakeBackend::replying("streamed words here");
    let orchestrator = orchestrator(claude.config(), gemini.config(), true);

    let chunks: Vec<_> = orchestrator
        .stream(&RequestContext::new(), &simple_request("gemini-flash"))
        .await
        .collect()
        .await;

    assert!(chunks.iter().all(|chunk| !chunk.is_error()));
    let text: String = chunks.iter().filter_map(StreamChunk::as_content).collect();
    assert_eq!(text, "streamed words here");
}

#[tokio::test]
async fn test_stream_exhaustion_is_single_error_chunk() {
    let claude = FakeBackend::failing(1, "down");
    let gemini = FakeBackend::failing(1, "also down");
    let orchestrator = orchestrator(claude.config(), gemini.config(), true);

    let chunks: Vec<_> = orchestrator
        .stream(&RequestContext::new(), &simple_request("claude-3-opus"))
        .await
        .collect()
        .await;

    assert_eq!(chunks.len(), 1);
    match &chunks[0] {
        StreamChunk::Error(err) => assert_eq!(err.attempted_agents(), ["claude", "gemini"]),
        other => panic!("unexpected chunk: {other:?}"),
    }
}

#[tokio::test]
async fn test_cancellation_skips_fallback() {
    let claude = FakeBackend::hanging();
    let gemini = FakeBackend::replying("unused");
    let orchestrator = orchestrator(claude.config(), gemini.config(), true);

    let ctx = RequestContext::new();
    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        cancel.cancel();
    });

    let err = orchestrator
        .execute(&ctx, &simple_request("claude-3-opus"))
        .await
        .expect_err("cancelled");

    assert!(err.is_cancelled());
    assert_eq!(err.attempted_agents(), ["claude"]);
    assert_eq!(gemini.invocations(), 0);
}

#[tokio::test]
async fn test_health_reports_backends_and_circuits() {
    let gemini = FakeBackend::replying("ok");
    let orchestrator = orchestrator(missing_backend(), gemini.config(), true);

    let health = orchestrator.health().await;

    assert_eq!(health.len(), 2);
    assert_eq!(health[0].name, "claude");
    assert!(!health[0].healthy);
    assert_eq!(health[1].name, "gemini");
    assert!(health[1].healthy);
    assert!(health.iter().all(|h| h.circuit == CircuitState::Closed));
}
