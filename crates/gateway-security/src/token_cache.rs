//! Encrypted cache of third-party OAuth tokens.
//!
//! Records are keyed by (user, organization, provider). Each record is
//! serialized, encrypted with AES-256-GCM using the storage key as
//! associated data, and written base64-encoded to the shared store. A
//! ciphertext moved under a different key fails authentication.

use crate::crypto::Encryption;
use crate::error::{Result, SecurityError};
use chrono::{DateTime, Utc};
use gateway_resilience::KeyValueStore;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// OAuth credentials for one provider.
#[derive(Clone)]
pub struct OAuthToken {
    access_token: SecretString,
    refresh_token: Option<SecretString>,
    expires_at: DateTime<Utc>,
    provider: String,
}

impl OAuthToken {
    /// Create a token record.
    #[must_use]
    pub fn new(
        provider: impl Into<String>,
        access_token: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: SecretString::new(access_token.into()),
            refresh_token: None,
            expires_at,
            provider: provider.into(),
        }
    }

    /// Attach a refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(SecretString::new(refresh_token.into()));
        self
    }

    /// Access token.
    #[must_use]
    pub fn access_token(&self) -> &SecretString {
        &self.access_token
    }

    /// Refresh token, if issued.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&SecretString> {
        self.refresh_token.as_ref()
    }

    /// Absolute expiry.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Provider tag.
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Check if the token is expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

impl std::fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthToken")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .field("provider", &self.provider)
            .finish()
    }
}

/// Plaintext wire form; wiped when dropped.
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct TokenRecord {
    access_token: String,
    refresh_token: Option<String>,
    #[zeroize(skip)]
    expires_at: DateTime<Utc>,
    provider: String,
}

impl From<&OAuthToken> for TokenRecord {
    fn from(token: &OAuthToken) -> Self {
        Self {
            access_token: token.access_token.expose_secret().clone(),
            refresh_token: token
                .refresh_token
                .as_ref()
                .map(|t| t.expose_secret().clone()),
            expires_at: token.expires_at,
            provider: token.provider.clone(),
        }
    }
}

impl From<&TokenRecord> for OAuthToken {
    fn from(record: &TokenRecord) -> Self {
        Self {
            access_token: SecretString::new(record.access_token.clone()),
            refresh_token: record.refresh_token.clone().map(SecretString::new),
            expires_at: record.expires_at,
            provider: record.provider.clone(),
        }
    }
}

/// Token cache configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenCacheConfig {
    /// Store TTL applied on every write.
    pub default_ttl: Duration,
    /// Namespace for storage keys.
    pub key_prefix: String,
}

impl Default for TokenCacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(24 * 60 * 60),
            key_prefix: "oauth_token".to_string(),
        }
    }
}

/// Encrypted OAuth token storage.
pub struct TokenCache {
    store: Arc<dyn KeyValueStore>,
    encryption: Encryption,
    config: TokenCacheConfig,
}

impl TokenCache {
    /// Create a token cache.
    #[must_use]
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        encryption: Encryption,
        config: TokenCacheConfig,
    ) -> Self {
        Self {
            store,
            encryption,
            config,
        }
    }

    /// Storage key for a (user, organization, provider) triple.
    ///
    /// # Errors
    /// Returns `Validation` if any component is empty or contains `:`.
    pub fn storage_key(&self, user_id: &str, org_id: &str, provider: &str) -> Result<String> {
        for (name, value) in [("user_id", user_id), ("org_id", org_id), ("provider", provider)] {
            if value.is_empty() || value.contains(':') {
                return Err(SecurityError::validation(format!(
                    "{name} must be non-empty and must not contain ':'"
                )));
            }
        }
        Ok(format!(
            "{}:{}:{}:{}",
            self.config.key_prefix, user_id, org_id, provider
        ))
    }

    async fn write(&self, user_id: &str, org_id: &str, token: &OAuthToken) -> Result<String> {
        let key = self.storage_key(user_id, org_id, &token.provider)?;

        let record = TokenRecord::from(token);
        let plaintext = Zeroizing::new(
            serde_json::to_vec(&record)
                .map_err(|e| SecurityError::Serialization(e.to_string()))?,
        );
        let sealed = self
            .encryption
            .encrypt_to_base64(&plaintext, key.as_bytes())?;

        self.store
            .set(&key, sealed.into_bytes(), self.config.default_ttl)
            .await?;

        Ok(key)
    }

    /// Encrypt and store a token, replacing any previous record.
    ///
    /// # Errors
    /// Returns error if encryption or the store fails.
    pub async fn store_token(&self, user_id: &str, org_id: &str, token: &OAuthToken) -> Result<()> {
        let key = self.write(user_id, org_id, token).await?;
        info!(key = %key, provider = %token.provider, "Stored OAuth token");
        Ok(())
    }

    /// Replace the stored token for the same triple.
    ///
    /// # Errors
    /// Returns error if encryption or the store fails.
    pub async fn update_token(
        &self,
        user_id: &str,
        org_id: &str,
        token: &OAuthToken,
    ) -> Result<()> {
        let key = self.write(user_id, org_id, token).await?;
        info!(key = %key, provider = %token.provider, "Updated OAuth token");
        Ok(())
    }

    /// Read and decrypt a token.
    ///
    /// # Errors
    /// Returns `NotFound` if absent, `DecryptionFailed` if the record does
    /// not authenticate, and `TokenExpired` if the record's own expiry has
    /// passed.
    pub async fn get_token(&self, user_id: &str, org_id: &str, provider: &str) -> Result<OAuthToken> {
        let key = self.storage_key(user_id, org_id, provider)?;

        let sealed = self
            .store
            .get(&key)
            .await?
            .ok_or_else(|| SecurityError::NotFound(key.clone()))?;

        let plaintext = self
            .encryption
            .decrypt_from_base64(&sealed, key.as_bytes())
            .map_err(|e| {
                warn!(key = %key, "OAuth token failed authentication");
                e
            })?;

        let record: TokenRecord = serde_json::from_slice(&plaintext)
            .map_err(|e| SecurityError::Serialization(e.to_string()))?;

        let token = OAuthToken::from(&record);
        if token.is_expired() {
            debug!(key = %key, expires_at = %token.expires_at, "OAuth token expired");
            return Err(SecurityError::TokenExpired(key));
        }

        Ok(token)
    }

    /// Delete a token.
    ///
    /// # Errors
    /// Returns error if the store fails.
    pub async fn revoke_token(&self, user_id: &str, org_id: &str, provider: &str) -> Result<()> {
        let key = self.storage_key(user_id, org_id, provider)?;
        let existed = self.store.delete(&key).await?;
        info!(key = %key, existed, "Revoked OAuth token");
        Ok(())
    }
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("store", &self.store.name())
            .field("encryption", &self.encryption)
            .field("config", &self.config)
            .finish()
    }
}
