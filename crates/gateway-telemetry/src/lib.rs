//! # Gateway Telemetry
//!
//! Observability for the Agent Gateway.
//!
//! This crate provides:
//! - Subscriber setup with pretty or JSON output
//! - Span helpers for agent calls and circuit breakers
//!
//! Library crates only emit events; installing a subscriber is left to the
//! binary through [`init_tracing`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod tracing_setup;

// Re-export main types
pub use tracing_setup::{init_tracing, LogFormat, TracingConfig, TracingError};
