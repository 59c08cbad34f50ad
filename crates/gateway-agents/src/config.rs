//! Agent configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default bound on one backend invocation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Backend executable and limits for one agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Path to the backend executable
    pub executable_path: PathBuf,
    /// Upper bound on one invocation
    pub timeout: Duration,
    /// Arguments placed before the generated ones
    pub extra_args: Vec<String>,
}

impl AgentConfig {
    /// Create a configuration with the default timeout
    #[must_use]
    pub fn new(executable_path: impl Into<PathBuf>) -> Self {
        Self {
            executable_path: executable_path.into(),
            timeout: DEFAULT_TIMEOUT,
            extra_args: Vec::new(),
        }
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add a leading argument
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Executable path
    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable_path
    }
}
