//! Error types for the offchain gateway
//!
//! Covers the failure modes of startup work: configuration, secret loading
//! and key parsing. Request-time protocol failures live in
//! [`crate::httpsig::HttpSigError`] and [`crate::auth::AuthError`].

use thiserror::Error;

/// Result type alias using OcError
pub type Result<T> = std::result::Result<T, OcError>;

/// Error type for configuration and key-loading operations
#[derive(Error, Debug)]
pub enum OcError {
    /// IO errors (config and secret files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Secret reference could not be resolved
    #[error("Secret error: {0}")]
    Secret(String),

    /// Key material is malformed
    #[error("Key error: {0}")]
    Key(String),
}

impl OcError {
    /// Create a config error with context
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a secret error with context
    pub fn secret(msg: impl Into<String>) -> Self {
        Self::Secret(msg.into())
    }

    /// Create a key error with context
    pub fn key(msg: impl Into<String>) -> Self {
        Self::Key(msg.into())
    }
}
