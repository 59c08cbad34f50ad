//! Cryptographic utilities.

use crate::error::{Result, SecurityError};
use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use base64::Engine;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

/// Key length for AES-256
pub const KEY_LEN: usize = 32;

const NONCE_LEN: usize = 12;

/// Authenticated encryption (AES-256-GCM) for data at rest.
///
/// Output layout is `nonce || ciphertext || tag` with a fresh random nonce
/// per call.
#[derive(Clone)]
pub struct Encryption {
    key: Zeroizing<[u8; KEY_LEN]>,
}

impl Encryption {
    /// Create a new encryption service with the given key.
    ///
    /// # Errors
    /// Returns `InvalidKey` unless the key is exactly 32 bytes.
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != KEY_LEN {
            return Err(SecurityError::InvalidKey(format!(
                "key must be {KEY_LEN} bytes, got {}",
                key.len()
            )));
        }

        let mut key_array = Zeroizing::new([0u8; KEY_LEN]);
        key_array.copy_from_slice(key);

        Ok(Self { key: key_array })
    }

    /// Create from a hex-encoded key.
    ///
    /// # Errors
    /// Returns error if key is invalid.
    pub fn from_hex(hex_key: &str) -> Result<Self> {
        let key = Zeroizing::new(
            hex::decode(hex_key.trim())
                .map_err(|e| SecurityError::InvalidKey(format!("invalid hex key: {e}")))?,
        );
        Self::new(&key)
    }

    /// Create from a base64-encoded key.
    ///
    /// # Errors
    /// Returns error if key is invalid.
    pub fn from_base64(b64_key: &str) -> Result<Self> {
        let key = Zeroizing::new(
            base64::engine::general_purpose::STANDARD
                .decode(b64_key.trim())
                .map_err(|e| SecurityError::InvalidKey(format!("invalid base64 key: {e}")))?,
        );
        Self::new(&key)
    }

    /// Create from a configured secret, hex (64 chars) or base64.
    ///
    /// # Errors
    /// Returns error if the secret decodes to anything but 32 bytes.
    pub fn from_secret(secret: &SecretString) -> Result<Self> {
        let encoded = secret.expose_secret().trim();
        if encoded.len() == KEY_LEN * 2 && encoded.bytes().all(|b| b.is_ascii_hexdigit()) {
            Self::from_hex(encoded)
        } else {
            Self::from_base64(encoded)
        }
    }

    /// Generate a new random key.
    #[must_use]
    pub fn generate_key() -> Zeroizing<[u8; KEY_LEN]> {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        rand::thread_rng().fill_bytes(&mut *key);
        key
    }

    fn cipher(&self) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&*self.key)
            .map_err(|e| SecurityError::InvalidKey(format!("failed to create cipher: {e}")))
    }

    /// Encrypt data, binding it to `aad`.
    ///
    /// The same `aad` must be presented to decrypt.
    ///
    /// # Errors
    /// Returns error if encryption fails.
    pub fn encrypt_with_aad(&self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let cipher = self.cipher()?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, Payload { msg: plaintext, aad })
            .map_err(|e| SecurityError::Encryption(format!("encryption failed: {e}")))?;

        let mut result = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend(ciphertext);

        Ok(result)
    }

    /// Decrypt data produced by [`Self::encrypt_with_aad`].
    ///
    /// # Errors
    /// Returns `DecryptionFailed` if the input is truncated, was produced
    /// under another key, was tampered with, or `aad` differs.
    pub fn decrypt_with_aad(&self, ciphertext: &[u8], aad: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        if ciphertext.len() < NONCE_LEN {
            return Err(SecurityError::DecryptionFailed(
                "ciphertext too short".to_string(),
            ));
        }

        let cipher = self.cipher()?;
        let (nonce, body) = ciphertext.split_at(NONCE_LEN);

        cipher
            .decrypt(Nonce::from_slice(nonce), Payload { msg: body, aad })
            .map(Zeroizing::new)
            .map_err(|_| SecurityError::DecryptionFailed("authentication failed".to_string()))
    }

    /// Encrypt data with no associated data.
    ///
    /// # Errors
    /// Returns error if encryption fails.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.encrypt_with_aad(plaintext, &[])
    }

    /// Decrypt data with no associated data.
    ///
    /// # Errors
    /// Returns error if decryption fails.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        self.decrypt_with_aad(ciphertext, &[])
    }

    /// Encrypt and return base64.
    ///
    /// # Errors
    /// Returns error if encryption fails.
    pub fn encrypt_to_base64(&self, plaintext: &[u8], aad: &[u8]) -> Result<String> {
        let encrypted = self.encrypt_with_aad(plaintext, aad)?;
        Ok(base64::engine::general_purpose::STANDARD.encode(encrypted))
    }

    /// Decrypt a base64 string.
    ///
    /// # Errors
    /// Returns error if decoding or decryption fails.
    pub fn decrypt_from_base64(&self, encoded: &[u8], aad: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let data = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| SecurityError::DecryptionFailed(format!("invalid base64: {e}")))?;
        self.decrypt_with_aad(&data, aad)
    }
}

impl std::fmt::Debug for Encryption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encryption")
            .field("key", &"[REDACTED]")
            .finish()
    }
}
