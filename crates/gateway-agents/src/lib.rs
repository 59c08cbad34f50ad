//! # Gateway Agents
//!
//! Completion agents for the Agent Gateway, each wrapping an external
//! command-line backend.
//!
//! This crate provides:
//! - [`ClaudeAgent`]: the `claude` CLI, streamed per character
//! - [`GeminiAgent`]: the `gemini` CLI, streamed per word
//! - A bounded, cancellable subprocess runner shared by both
//!
//! ## Example
//!
//! ```ignore
//! use gateway_agents::{AgentConfig, ClaudeAgent};
//! use gateway_core::{Agent, ChatMessage, CompletionRequest, RequestContext};
//!
//! let agent = ClaudeAgent::new(AgentConfig::new("/usr/local/bin/claude"));
//!
//! let request = CompletionRequest::builder()
//!     .model("claude-3-5-sonnet")
//!     .message(ChatMessage::user("Hello"))
//!     .build()?;
//!
//! let response = agent.execute(&RequestContext::new(), &request).await?;
//! println!("{}", response.content);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod chunking;
pub mod claude;
pub mod config;
pub mod gemini;
pub mod models;
pub mod process;
pub mod prompt;

// Re-export main types
pub use claude::{ClaudeAgent, CLAUDE_AGENT_NAME};
pub use config::{AgentConfig, DEFAULT_TIMEOUT};
pub use gemini::{GeminiAgent, GEMINI_AGENT_NAME};
pub use models::ModelTable;
pub use prompt::{Prompt, DEFAULT_SYSTEM_PROMPT};
