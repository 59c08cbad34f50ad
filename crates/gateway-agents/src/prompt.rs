//! Prompt assembly from a completion request.

use gateway_core::{CompletionRequest, GatewayError, GatewayResult};

/// System prompt used when the request carries none
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// System and user text handed to a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// System prompt
    pub system: String,
    /// Most recent user message
    pub user: String,
}

impl Prompt {
    /// Extract the prompt from `request`
    ///
    /// # Errors
    /// Returns `InvalidRequest` if the request has no user message
    pub fn from_request(request: &CompletionRequest) -> GatewayResult<Self> {
        let user = request.last_user_message().ok_or_else(|| {
            GatewayError::invalid_request("request contains no user message", Some("messages"))
        })?;

        let system = request
            .system_prompt
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);

        Ok(Self {
            system: system.to_string(),
            user: user.content.clone(),
        })
    }

    /// System prompt and user message as one block of text
    #[must_use]
    pub fn combined(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}
