//! File and environment loading.
//!
//! # Environment overrides
//! - `GATEWAY_BREAKER_FAILURE_THRESHOLD`, `GATEWAY_BREAKER_SUCCESS_THRESHOLD`,
//!   `GATEWAY_BREAKER_TIMEOUT`, `GATEWAY_BREAKER_MAX_CONCURRENT_REQUESTS`
//! - `GATEWAY_RATE_LIMIT_REQUESTS_PER_MINUTE`, `GATEWAY_RATE_LIMIT_BURST_SIZE`,
//!   `GATEWAY_RATE_LIMIT_KEY_PREFIX`
//! - `GATEWAY_TOKEN_CACHE_ENCRYPTION_KEY`, `GATEWAY_TOKEN_CACHE_DEFAULT_TTL`,
//!   `GATEWAY_TOKEN_CACHE_KEY_PREFIX`
//! - `GATEWAY_PRIMARY_AGENT`, `GATEWAY_FALLBACK_ENABLED`
//! - `GATEWAY_CLAUDE_PATH`, `GATEWAY_CLAUDE_TIMEOUT`, `GATEWAY_GEMINI_PATH`,
//!   `GATEWAY_GEMINI_TIMEOUT`
//! - `GATEWAY_REDIS_URL`
//! - `GATEWAY_LOG_LEVEL`, `GATEWAY_LOG_FORMAT`
//!
//! Durations use humantime notation (`45s`, `2m`).

use crate::error::ConfigError;
use crate::settings::GatewayConfig;
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Variable naming an optional configuration file
pub const CONFIG_PATH_VAR: &str = "GATEWAY_CONFIG";

impl GatewayConfig {
    /// Load a configuration file, picking the format from its extension
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed, or its
    /// extension is not `yaml`, `yml` or `toml`
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let config = match extension.as_str() {
            "yaml" | "yml" => Self::from_yaml(&contents)?,
            "toml" => Self::from_toml(&contents)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        debug!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    /// Parse YAML text
    ///
    /// # Errors
    /// Returns `Parse` on malformed input
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse {
            format: "YAML",
            message: e.to_string(),
        })
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// Returns `Parse` on malformed input
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse {
            format: "TOML",
            message: e.to_string(),
        })
    }

    /// Apply `GATEWAY_*` overrides read through `lookup`
    ///
    /// # Errors
    /// Returns `InvalidEnv` naming the first variable that does not parse
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let breaker = &mut self.circuit_breaker;
        env.parse("GATEWAY_BREAKER_FAILURE_THRESHOLD", &mut breaker.failure_threshold)?;
        env.parse("GATEWAY_BREAKER_SUCCESS_THRESHOLD", &mut breaker.success_threshold)?;
        env.duration("GATEWAY_BREAKER_TIMEOUT", &mut breaker.timeout)?;
        env.parse(
            "GATEWAY_BREAKER_MAX_CONCURRENT_REQUESTS",
            &mut breaker.max_concurrent_requests,
        )?;

        let limit = &mut self.rate_limit;
        env.parse("GATEWAY_RATE_LIMIT_REQUESTS_PER_MINUTE", &mut limit.requests_per_minute)?;
        env.parse("GATEWAY_RATE_LIMIT_BURST_SIZE", &mut limit.burst_size)?;
        env.string("GATEWAY_RATE_LIMIT_KEY_PREFIX", &mut limit.key_prefix);

        let cache = &mut self.token_cache;
        if let Some(key) = env.get("GATEWAY_TOKEN_CACHE_ENCRYPTION_KEY") {
            cache.encryption_key = Some(SecretString::new(key));
        }
        env.duration("GATEWAY_TOKEN_CACHE_DEFAULT_TTL", &mut cache.default_ttl)?;
        env.string("GATEWAY_TOKEN_CACHE_KEY_PREFIX", &mut cache.key_prefix);

        env.string("GATEWAY_PRIMARY_AGENT", &mut self.orchestrator.primary_agent);
        env.flag("GATEWAY_FALLBACK_ENABLED", &mut self.orchestrator.fallback_enabled)?;

        for name in crate::settings::KNOWN_AGENTS {
            let prefix = format!("GATEWAY_{}", name.to_ascii_uppercase());
            if let Some(agent) = self.agents.get_mut(name) {
                if let Some(path) = env.get(&format!("{prefix}_PATH")) {
                    agent.path = PathBuf::from(path);
                }
                env.duration(&format!("{prefix}_TIMEOUT"), &mut agent.timeout)?;
            }
        }

        if let Some(url) = env.get("GATEWAY_REDIS_URL") {
            self.store.redis_url = Some(url);
        }

        env.string("GATEWAY_LOG_LEVEL", &mut self.telemetry.log_level);
        env.parse("GATEWAY_LOG_FORMAT", &mut self.telemetry.format)?;

        Ok(())
    }

    /// Load from `GATEWAY_CONFIG` (if set) and the process environment, then validate
    ///
    /// # Errors
    /// Returns error if the file, an override or the result is invalid
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    /// [`GatewayConfig::load`] with an explicit variable lookup
    ///
    /// # Errors
    /// Returns error if the file, an override or the result is invalid
    pub fn load_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_PATH_VAR) {
            Some(path) if !path.trim().is_empty() => Self::from_file(Path::new(&path))?,
            _ => Self::default(),
        };
        config.apply_env(&lookup)?;
        config.validate()?;
        Ok(config)
    }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, var: &str) -> Option<String> {
        (self.0)(var)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn string(&self, var: &str, target: &mut String) {
        if let Some(value) = self.get(var) {
            *target = value;
        }
    }

    fn parse<T>(&self, var: &str, target: &mut T) -> Result<(), ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        if let Some(value) = self.get(var) {
            *target = value
                .parse()
                .map_err(|e| ConfigError::invalid_env(var, format!("'{value}': {e}")))?;
        }
        Ok(())
    }

    fn duration(&self, var: &str, target: &mut Duration) -> Result<(), ConfigError> {
        if let Some(value) = self.get(var) {
            *target = humantime::parse_duration(&value)
                .map_err(|e| ConfigError::invalid_env(var, format!("'{value}': {e}")))?;
        }
        Ok(())
    }

    fn flag(&self, var: &str, target: &mut bool) -> Result<(), ConfigError> {
        if let Some(value) = self.get(var) {
            *target = match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::invalid_env(
                        var,
                        format!("'{value}' is not a boolean"),
                    ))
                }
            };
        }
        Ok(())
    }
}
