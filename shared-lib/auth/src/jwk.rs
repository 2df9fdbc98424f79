//! Symmetric key material loading.
//!
//! ejabberd's `jwt_key` option takes an `oct` JWK. The deployment hands the
//! same JWK to clients as a base64-encoded JSON blob.

use std::fmt;

use error::AuthError;
use serde::Deserialize;

use crate::base64url;

/// Key type tag for symmetric JWKs.
pub const OCT_KEY_TYPE: &str = "oct";

#[derive(Debug, Deserialize)]
struct Jwk {
    kty: Option<String>,
    k: Option<String>,
    #[serde(default)]
    kid: Option<String>,
}

/// Decoded symmetric key, immutable once loaded.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    kty: String,
    secret: Vec<u8>,
    kid: Option<String>,
}

impl KeyMaterial {
    /// Decode a base64-encoded JWK blob and extract the `k` secret and optional `kid`.
    pub fn from_jwk_b64(blob: &str) -> Result<Self, AuthError> {
        let raw = base64url::decode_standard(blob)
            .map_err(|e| AuthError::malformed(format!("blob is not valid base64: {}", e)))?;
        let json = String::from_utf8(raw)
            .map_err(|e| AuthError::malformed(format!("blob is not UTF-8: {}", e)))?;
        Self::from_jwk_json(&json)
    }

    /// Parse a JWK JSON document.
    pub fn from_jwk_json(json: &str) -> Result<Self, AuthError> {
        let jwk: Jwk = serde_json::from_str(json)
            .map_err(|e| AuthError::malformed(format!("JWK is not valid JSON: {}", e)))?;

        let kty = jwk.kty.unwrap_or_else(|| OCT_KEY_TYPE.to_string());
        if kty != OCT_KEY_TYPE {
            return Err(AuthError::malformed(format!(
                "unsupported key type {:?}, expected {:?}",
                kty, OCT_KEY_TYPE
            )));
        }

        let k = jwk
            .k
            .ok_or_else(|| AuthError::malformed("JWK has no `k` field"))?;
        let secret = base64url::decode_key(&k)
            .map_err(|e| AuthError::malformed(format!("`k` is not valid base64url: {}", e)))?;

        let kid = jwk.kid.filter(|kid| !kid.is_empty());

        tracing::debug!(
            "Loaded {} key ({} bytes, kid={:?})",
            kty,
            secret.len(),
            kid
        );

        Ok(Self { kty, secret, kid })
    }

    /// Build key material from a bare base64url `k` value.
    pub fn from_b64url_secret(k: &str) -> Result<Self, AuthError> {
        let secret = base64url::decode_key(k)
            .map_err(|e| AuthError::malformed(format!("secret is not valid base64url: {}", e)))?;
        Ok(Self {
            kty: OCT_KEY_TYPE.to_string(),
            secret,
            kid: None,
        })
    }

    /// Attach or replace the key identifier.
    pub fn with_kid(mut self, kid: impl Into<String>) -> Self {
        self.kid = Some(kid.into());
        self
    }

    pub fn kty(&self) -> &str {
        &self.kty
    }

    /// Raw HMAC key bytes.
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }

    pub fn len(&self) -> usize {
        self.secret.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secret.is_empty()
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("kty", &self.kty)
            .field("secret", &format_args!("<{} bytes>", self.secret.len()))
            .field("kid", &self.kid)
            .finish()
    }
}
