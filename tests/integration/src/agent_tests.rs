//! Agent integration tests
//!
//! Drive the Claude and Gemini agents against scripted fake backends and
//! check the invocation they build, output mapping, streaming, failure
//! reporting and process teardown.

use crate::fixtures::*;
use crate::helpers::*;
use futures::StreamExt;
use gateway_agents::{ClaudeAgent, GeminiAgent, DEFAULT_SYSTEM_PROMPT};
use gateway_core::{
    Agent, ChatMessage, CompletionRequest, GatewayError, RequestContext, StreamChunk,
};
use pretty_assertions::assert_eq;
use std::time::Duration;

fn contents(chunks: &[StreamChunk]) -> Vec<&str> {
    chunks.iter().filter_map(StreamChunk::as_content).collect()
}

/// Claude gets the translated model flag, the system prompt and the user message
#[tokio::test]
async fn test_claude_invocation_and_output() {
    init_tracing();
    let backend = FakeBackend::replying("  Hello from Claude \n");
    let agent = ClaudeAgent::new(backend.config());

    let response = agent
        .execute(
            &RequestContext::new(),
            &request_with_system("claude-3-opus", "Be terse", "Hi there"),
        )
        .await
        .expect("response");

    assert_eq!(response.content, "Hello from Claude");
    assert_eq!(response.model, "claude-3-opus");
    assert_eq!(response.agent.as_deref(), Some("claude"));
    assert_eq!(
        backend.last_args(),
        vec![
            "--print",
            "--model",
            "opus",
            "--system-prompt",
            "Be terse",
            "Hi there"
        ]
    );
}

/// Without a system prompt the default is used, and only the last user message is sent
#[tokio::test]
async fn test_default_system_prompt_and_last_user_message() {
    let backend = FakeBackend::replying("12");
    let agent = ClaudeAgent::new(backend.config());

    agent
        .execute(&RequestContext::new(), &multi_turn_request("claude-3-5-sonnet"))
        .await
        .expect("response");

    let args = backend.last_args();
    assert_eq!(args[args.len() - 2], DEFAULT_SYSTEM_PROMPT);
    assert_eq!(args[args.len() - 1], "And times 3?");
}

/// Unmapped model ids reach the backend unchanged
#[tokio::test]
async fn test_unmapped_model_passes_through() {
    let backend = FakeBackend::replying("ok");
    let agent = ClaudeAgent::new(backend.config());

    agent
        .execute(&RequestContext::new(), &simple_request("claude-experimental-7"))
        .await
        .expect("response");

    assert_eq!(backend.last_args()[2], "claude-experimental-7");
}

/// Gemini receives the system prompt prepended to the user message
#[tokio::test]
async fn test_gemini_invocation() {
    let backend = FakeBackend::replying("Bonjour");
    let agent = GeminiAgent::new(backend.config());

    let response = agent
        .execute(
            &RequestContext::new(),
            &request_with_system("gemini-pro", "Answer in French", "Hello"),
        )
        .await
        .expect("response");

    assert_eq!(response.content, "Bonjour");
    assert_eq!(
        backend.last_args(),
        vec![
            "--model",
            "gemini-2.5-pro",
            "--prompt",
            "Answer in French\n\nHello"
        ]
    );
}

/// A non-zero exit surfaces as a backend failure carrying stderr
#[tokio::test]
async fn test_backend_failure_carries_stderr() {
    let backend = FakeBackend::failing(2, "token expired, run login");
    let agent = ClaudeAgent::new(backend.config());

    let err = agent
        .execute(&RequestContext::new(), &simple_request("claude-3-haiku"))
        .await
        .expect_err("should fail");

    match err {
        GatewayError::BackendExecutionFailed {
            agent,
            exit_code,
            stderr,
            ..
        } => {
            assert_eq!(agent, "claude");
            assert_eq!(exit_code, Some(2));
            assert!(stderr.contains("token expired"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

/// Requests without a user message never start the backend
#[tokio::test]
async fn test_missing_user_message_is_invalid() {
    let backend = FakeBackend::replying("unused");
    let agent = GeminiAgent::new(backend.config());
    let request = CompletionRequest::builder()
        .model("gemini-pro")
        .message(ChatMessage::system("Only a system message"))
        .build()
        .expect("valid request");

    let err = agent
        .execute(&RequestContext::new(), &request)
        .await
        .expect_err("should fail");

    assert!(matches!(err, GatewayError::InvalidRequest { .. }));
    assert_eq!(backend.invocations(), 0);
}

/// Claude streams one chunk per character
#[tokio::test]
async fn test_claude_streams_characters() {
    let backend = FakeBackend::replying("héllo");
    let agent = ClaudeAgent::new(backend.config());

    let chunks: Vec<_> = agent
        .stream(&RequestContext::new(), &simple_request("claude-3-opus"))
        .await
        .collect()
        .await;

    assert_eq!(contents(&chunks), vec!["h", "é", "l", "l", "o"]);
}

/// Gemini streams words with separator chunks between them
#[tokio::test]
async fn test_gemini_streams_words() {
    let backend = FakeBackend::replying("hello big world");
    let agent = GeminiAgent::new(backend.config());

    let chunks: Vec<_> = agent
        .stream(&RequestContext::new(), &simple_request("gemini-flash"))
        .await
        .collect()
        .await;

    assert_eq!(contents(&chunks), vec!["hello", " ", "big", " ", "world"]);
    assert_eq!(contents(&chunks).concat(), "hello big world");
}

/// A failed stream is exactly one error chunk
#[tokio::test]
async fn test_stream_failure_is_single_error_chunk() {
    let backend = FakeBackend::failing(1, "boom");
    let agent = GeminiAgent::new(backend.config());

    let chunks: Vec<_> = agent
        .stream(&RequestContext::new(), &simple_request("gemini-pro"))
        .await
        .collect()
        .await;

    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].is_error());
}

/// A backend that overruns its timeout is killed before the call returns
#[tokio::test]
async fn test_timeout_terminates_backend() {
    let backend = FakeBackend::hanging();
    let agent = ClaudeAgent::new(backend.config().with_timeout(Duration::from_millis(500)));

    let err = agent
        .execute(&RequestContext::new(), &simple_request("claude-3-opus"))
        .await
        .expect_err("should time out");
    assert!(matches!(err, GatewayError::Timeout { .. }));

    let pid = backend.pid().expect("backend recorded its pid");
    assert!(!process_alive(pid), "backend outlived its timeout");
}

/// Helpers started by a backend die with it on timeout
#[tokio::test]
async fn test_timeout_terminates_backend_helpers() {
    let backend = FakeBackend::spawning_helper();
    let agent = GeminiAgent::new(backend.config().with_timeout(Duration::from_millis(500)));

    let err = agent
        .execute(&RequestContext::new(), &simple_request("gemini-pro"))
        .await
        .expect_err("should time out");
    assert!(matches!(err, GatewayError::Timeout { .. }));

    let pid = backend.pid().expect("helper recorded its pid");
    let stopped = wait_for(
        || {
            let alive = process_alive(pid);
            async move { !alive }
        },
        Duration::from_secs(2),
    )
    .await;
    assert!(stopped, "backend helper outlived the timeout");
}

/// Cancelling the request stops the backend
#[tokio::test]
async fn test_cancellation_terminates_backend() {
    let backend = FakeBackend::hanging();
    let agent = GeminiAgent::new(backend.config());

    let ctx = RequestContext::new();
    let cancel = ctx.cancel.clone();
    let pid_file = backend.script().with_file_name("pid");
    tokio::spawn(async move {
        wait_for(
            || {
                let ready = pid_file.exists();
                async move { ready }
            },
            Duration::from_secs(5),
        )
        .await;
        cancel.cancel();
    });

    let err = agent
        .execute(&ctx, &simple_request("gemini-pro"))
        .await
        .expect_err("should be cancelled");
    assert!(err.is_cancelled());

    let pid = backend.pid().expect("backend recorded its pid");
    assert!(!process_alive(pid), "backend outlived cancellation");
}

/// Health is a presence check on the executable
#[tokio::test]
async fn test_health_is_presence_check() {
    let backend = FakeBackend::replying("ok");

    assert!(ClaudeAgent::new(backend.config()).is_healthy().await);
    assert!(!GeminiAgent::new(missing_backend()).is_healthy().await);
}
