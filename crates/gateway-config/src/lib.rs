//! # Gateway Config
//!
//! Configuration for the Agent Gateway.
//!
//! This crate provides:
//! - [`GatewayConfig`] with one section per component and sensible defaults
//! - Loading from YAML or TOML files
//! - `GATEWAY_*` environment overrides through an injectable lookup
//! - Validation and conversion into the component configurations
//!
//! ## Example
//!
//! ```ignore
//! use gateway_config::GatewayConfig;
//!
//! let config = GatewayConfig::load()?;
//! let breaker = config.circuit_breaker.to_breaker_config();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod settings;

// Re-export main types
pub use error::ConfigError;
pub use loader::CONFIG_PATH_VAR;
pub use settings::{
    AgentSettings, AgentsSettings, CircuitBreakerSettings, GatewayConfig, OrchestratorSettings,
    RateLimitSettings, StoreSettings, TelemetrySettings, TokenCacheSettings,
};
