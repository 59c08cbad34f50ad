//! Configuration errors.

use thiserror::Error;

/// Configuration loading or validation failure
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        /// File path
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is malformed
    #[error("Failed to parse {format} config: {message}")]
    Parse {
        /// File format
        format: &'static str,
        /// Parser message
        message: String,
    },

    /// The file extension is not a supported format
    #[error("Unsupported config file format: {0}")]
    UnsupportedFormat(String),

    /// An environment override could not be parsed
    #[error("Invalid value for {var}: {message}")]
    InvalidEnv {
        /// Variable name
        var: String,
        /// What is wrong with the value
        message: String,
    },

    /// The configuration is structurally valid but unusable
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

impl ConfigError {
    pub(crate) fn invalid_env(var: &str, message: impl Into<String>) -> Self {
        Self::InvalidEnv {
            var: var.to_string(),
            message: message.into(),
        }
    }
}

impl From<validator::ValidationErrors> for ConfigError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}
