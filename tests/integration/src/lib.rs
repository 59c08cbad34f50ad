//! Integration tests for the Agent Gateway
//!
//! This crate provides cross-crate tests covering:
//! - Agents driving scripted fake backends
//! - Orchestration with circuit breaking and fallback
//! - Rate limiting over the shared store
//! - Encrypted OAuth token caching
//! - Store behavior, including Redis when `REDIS_URL` is set
//! - Wiring components from a loaded configuration file

pub mod fixtures;
pub mod helpers;

// Re-export commonly used items
pub use fixtures::*;
pub use helpers::*;

#[cfg(all(test, unix))]
mod agent_tests;
#[cfg(all(test, unix))]
mod orchestrator_tests;
#[cfg(test)]
mod rate_limit_tests;
#[cfg(test)]
mod store_tests;
