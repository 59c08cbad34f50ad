//! # Gateway Routing
//!
//! Agent orchestration for the Agent Gateway.
//!
//! This crate provides:
//! - Primary agent selection by name
//! - Health-aware, single-hop fallback to a secondary agent
//! - Per-agent circuit breaking on every attempt
//! - Aggregated model catalog and health view

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod orchestrator;

// Re-export main types
pub use orchestrator::{AgentHealth, Orchestrator, OrchestratorBuilder};
