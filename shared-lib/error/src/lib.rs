//! Common error types for the ejabberd probe tools.
//!
//! This crate provides the error enums shared between the token library
//! and the probe binaries.

use thiserror::Error;

/// Key material and token errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// The key blob could not be decoded into a usable symmetric key.
    #[error("Malformed key material: {0}")]
    MalformedKeyMaterial(String),

    /// The key decoded but cannot be used for signing (e.g. zero length).
    #[error("Invalid key material: signing key must not be empty")]
    InvalidKeyMaterial,

    #[error("Token creation failed: {0}")]
    TokenCreationFailed(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,
}

impl AuthError {
    /// Shorthand for a `MalformedKeyMaterial` with a formatted reason.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedKeyMaterial(reason.into())
    }

    pub fn invalid_token(reason: impl Into<String>) -> Self {
        Self::InvalidToken(reason.into())
    }
}

/// Configuration errors raised while reading the environment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    MissingVariable(String),

    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: String, value: String },

    #[error("Key material error: {0}")]
    Key(#[from] AuthError),
}

/// Result type alias using AuthError.
pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_message() {
        let err = AuthError::malformed("missing field `k`");
        assert_eq!(err.to_string(), "Malformed key material: missing field `k`");
    }

    #[test]
    fn test_config_error_wraps_auth_error() {
        let err: ConfigError = AuthError::InvalidKeyMaterial.into();
        assert_eq!(err, ConfigError::Key(AuthError::InvalidKeyMaterial));
        assert!(err.to_string().contains("must not be empty"));
    }
}
