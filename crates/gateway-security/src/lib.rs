//! # Gateway Security
//!
//! Encryption at rest for the Agent Gateway.
//!
//! ## Features
//!
//! - **Authenticated Encryption**: AES-256-GCM with associated data
//! - **OAuth Token Cache**: third-party credentials keyed by user,
//!   organization and provider, never stored in cleartext
//!
//! ## Example
//!
//! ```rust,no_run
//! use gateway_resilience::MemoryStore;
//! use gateway_security::{Encryption, TokenCache, TokenCacheConfig};
//! use std::sync::Arc;
//!
//! let key = Encryption::generate_key();
//! let encryption = Encryption::new(&*key).expect("32-byte key");
//! let cache = TokenCache::new(Arc::new(MemoryStore::new()), encryption, TokenCacheConfig::default());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod crypto;
pub mod error;
pub mod token_cache;

pub use crypto::Encryption;
pub use error::{Result, SecurityError};
pub use token_cache::{OAuthToken, TokenCache, TokenCacheConfig};
