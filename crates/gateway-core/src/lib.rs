//! # Gateway Core
//!
//! Core types, the agent contract, and error handling for the Agent Gateway.
//!
//! This crate provides the foundational types used throughout the gateway:
//! - Completion request and response types
//! - The [`Agent`] trait and model catalog entries
//! - Per-request cancellation context
//! - Error types and handling

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod agent;
pub mod context;
pub mod error;
pub mod request;
pub mod response;
pub mod streaming;

// Re-export commonly used types
pub use agent::{Agent, ModelInfo};
pub use context::RequestContext;
pub use error::{GatewayError, GatewayResult};
pub use request::{ChatMessage, CompletionRequest, CompletionRequestBuilder, MessageRole};
pub use response::{CompletionResponse, FinishReason};
pub use streaming::{ChunkStream, StreamChunk};
