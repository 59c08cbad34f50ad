//! Security error types.

use gateway_resilience::StoreError;

/// Result type for security operations.
pub type Result<T> = std::result::Result<T, SecurityError>;

/// Security error type.
#[derive(Debug, thiserror::Error)]
pub enum SecurityError {
    /// No record stored under the key.
    #[error("Token not found: {0}")]
    NotFound(String),

    /// Stored record is past its own expiry.
    #[error("Token expired: {0}")]
    TokenExpired(String),

    /// Ciphertext failed authentication or could not be decoded.
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Encryption error.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Key material is unusable.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Caller supplied an unusable identifier.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Backing store failure.
    #[error("Store error: {0}")]
    Store(String),
}

impl From<StoreError> for SecurityError {
    fn from(err: StoreError) -> Self {
        Self::Store(err.to_string())
    }
}

impl SecurityError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Check if error is a client error (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::TokenExpired(_) | Self::Validation(_)
        )
    }

    /// Get HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::TokenExpired(_) => 401,
            Self::Validation(_) => 400,
            Self::Store(_) => 503,
            Self::DecryptionFailed(_)
            | Self::Encryption(_)
            | Self::InvalidKey(_)
            | Self::Serialization(_) => 500,
        }
    }
}
