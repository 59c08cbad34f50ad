//! Configuration sections.
//!
//! Every section deserializes with defaults, so a file only needs the
//! keys it changes. Durations use humantime notation (`30s`, `5m`, `24h`).

use crate::error::ConfigError;
use gateway_agents::{AgentConfig, CLAUDE_AGENT_NAME, DEFAULT_TIMEOUT, GEMINI_AGENT_NAME};
use gateway_resilience::{CircuitBreakerConfig, RateLimiterConfig};
use gateway_security::{Encryption, TokenCacheConfig};
use gateway_telemetry::{LogFormat, TracingConfig};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

/// Agent names the gateway knows how to build
pub const KNOWN_AGENTS: [&str; 2] = [CLAUDE_AGENT_NAME, GEMINI_AGENT_NAME];

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct GatewayConfig {
    /// Circuit breaker settings, shared by all agents
    #[validate(nested)]
    pub circuit_breaker: CircuitBreakerSettings,
    /// Rate limiter settings
    #[validate(nested)]
    pub rate_limit: RateLimitSettings,
    /// Token cache settings
    #[validate(nested)]
    pub token_cache: TokenCacheSettings,
    /// Orchestrator settings
    pub orchestrator: OrchestratorSettings,
    /// Per-agent settings
    pub agents: AgentsSettings,
    /// Shared store settings
    pub store: StoreSettings,
    /// Logging settings
    pub telemetry: TelemetrySettings,
}

impl GatewayConfig {
    /// Check bounds and cross-field constraints
    ///
    /// # Errors
    /// Returns `Validation` describing the first problem found
    pub fn validate(&self) -> Result<(), ConfigError> {
        Validate::validate(self)?;

        if self.circuit_breaker.timeout.is_zero() {
            return Err(ConfigError::Validation(
                "circuit_breaker.timeout must be greater than zero".to_string(),
            ));
        }

        if !KNOWN_AGENTS.contains(&self.orchestrator.primary_agent.as_str()) {
            return Err(ConfigError::Validation(format!(
                "orchestrator.primary_agent must be one of {}, got '{}'",
                KNOWN_AGENTS.join(", "),
                self.orchestrator.primary_agent
            )));
        }

        for (name, agent) in self.agents.iter() {
            if agent.timeout.is_zero() {
                return Err(ConfigError::Validation(format!(
                    "agents.{name}.timeout must be greater than zero"
                )));
            }
            if agent.path.as_os_str().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "agents.{name}.path cannot be empty"
                )));
            }
        }

        self.token_cache.encryption()?;
        Ok(())
    }
}

/// Circuit breaker section
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    /// Consecutive failures before opening
    #[validate(range(min = 1))]
    pub failure_threshold: u32,
    /// Half-open successes before closing
    #[validate(range(min = 1))]
    pub success_threshold: u32,
    /// Time spent open before probing
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Probes allowed in flight while half-open
    #[validate(range(min = 1))]
    pub max_concurrent_requests: u32,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        let defaults = CircuitBreakerConfig::default();
        Self {
            failure_threshold: defaults.failure_threshold,
            success_threshold: defaults.success_threshold,
            timeout: defaults.timeout,
            max_concurrent_requests: defaults.max_concurrent_requests,
        }
    }
}

impl CircuitBreakerSettings {
    /// Breaker configuration
    #[must_use]
    pub fn to_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            success_threshold: self.success_threshold,
            timeout: self.timeout,
            max_concurrent_requests: self.max_concurrent_requests,
        }
    }
}

/// Rate limiter section
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Requests allowed per identity and endpoint each minute
    #[validate(range(min = 1))]
    pub requests_per_minute: u32,
    /// Burst allowance, accepted but not enforced
    #[validate(range(min = 1))]
    pub burst_size: u32,
    /// Counter key namespace
    #[validate(length(min = 1))]
    pub key_prefix: String,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        let defaults = RateLimiterConfig::default();
        Self {
            requests_per_minute: defaults.requests_per_minute,
            burst_size: defaults.burst_size,
            key_prefix: defaults.key_prefix,
        }
    }
}

impl RateLimitSettings {
    /// Rate limiter configuration
    #[must_use]
    pub fn to_limiter_config(&self) -> RateLimiterConfig {
        RateLimiterConfig {
            requests_per_minute: self.requests_per_minute,
            burst_size: self.burst_size,
            key_prefix: self.key_prefix.clone(),
        }
    }
}

/// Token cache section
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct TokenCacheSettings {
    /// 32-byte key, as 64 hex characters or base64
    pub encryption_key: Option<SecretString>,
    /// Store TTL for cached tokens
    #[serde(with = "humantime_serde")]
    pub default_ttl: Duration,
    /// Storage key namespace
    #[validate(length(min = 1))]
    pub key_prefix: String,
}

impl Default for TokenCacheSettings {
    fn default() -> Self {
        let defaults = TokenCacheConfig::default();
        Self {
            encryption_key: None,
            default_ttl: defaults.default_ttl,
            key_prefix: defaults.key_prefix,
        }
    }
}

impl TokenCacheSettings {
    /// Token cache configuration
    #[must_use]
    pub fn to_cache_config(&self) -> TokenCacheConfig {
        TokenCacheConfig {
            default_ttl: self.default_ttl,
            key_prefix: self.key_prefix.clone(),
        }
    }

    /// Cipher for the configured key, if one is set
    ///
    /// # Errors
    /// Returns `Validation` if the key is not 32 bytes of hex or base64
    pub fn encryption(&self) -> Result<Option<Encryption>, ConfigError> {
        self.encryption_key
            .as_ref()
            .map(Encryption::from_secret)
            .transpose()
            .map_err(|e| ConfigError::Validation(format!("token_cache.encryption_key: {e}")))
    }
}

/// Orchestrator section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchestratorSettings {
    /// Agent tried first
    pub primary_agent: String,
    /// Whether a failed or unhealthy primary falls back to the other agent
    pub fallback_enabled: bool,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            primary_agent: CLAUDE_AGENT_NAME.to_string(),
            fallback_enabled: true,
        }
    }
}

/// One agent's backend settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Backend executable
    pub path: PathBuf,
    /// Upper bound on one invocation
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Arguments placed before the generated ones
    pub extra_args: Vec<String>,
}

impl AgentSettings {
    fn with_path(path: &str) -> Self {
        Self {
            path: PathBuf::from(path),
            timeout: DEFAULT_TIMEOUT,
            extra_args: Vec::new(),
        }
    }

    /// Agent configuration
    #[must_use]
    pub fn to_agent_config(&self) -> AgentConfig {
        let mut config = AgentConfig::new(&self.path).with_timeout(self.timeout);
        config.extra_args.clone_from(&self.extra_args);
        config
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::with_path("")
    }
}

/// Settings for every known agent
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentsSettings {
    /// Claude CLI
    pub claude: AgentSettings,
    /// Gemini CLI
    pub gemini: AgentSettings,
}

impl Default for AgentsSettings {
    fn default() -> Self {
        Self {
            claude: AgentSettings::with_path("/usr/local/bin/claude"),
            gemini: AgentSettings::with_path("/usr/local/bin/gemini"),
        }
    }
}

impl AgentsSettings {
    /// `(name, settings)` pairs in configuration order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &AgentSettings)> {
        [
            (CLAUDE_AGENT_NAME, &self.claude),
            (GEMINI_AGENT_NAME, &self.gemini),
        ]
        .into_iter()
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut AgentSettings> {
        match name {
            CLAUDE_AGENT_NAME => Some(&mut self.claude),
            GEMINI_AGENT_NAME => Some(&mut self.gemini),
            _ => None,
        }
    }
}

/// Shared store section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Redis URL; the in-process store is used when absent
    pub redis_url: Option<String>,
}

/// Logging section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    /// Emit logs at all
    pub enabled: bool,
    /// Level used when `RUST_LOG` is unset
    pub log_level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl TelemetrySettings {
    /// Tracing configuration for `service_name`
    #[must_use]
    pub fn to_tracing_config(&self, service_name: &str) -> TracingConfig {
        TracingConfig::new(service_name)
            .with_enabled(self.enabled)
            .with_log_level(&self.log_level)
            .with_format(self.format)
    }
}
