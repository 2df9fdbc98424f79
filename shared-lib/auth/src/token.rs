//! HS256 token encoding and decoding.
//!
//! Tokens are assembled by hand: `b64url(header) . b64url(claims) . b64url(mac)`,
//! all segments unpadded, MAC = HMAC-SHA256 over the first two segments joined by `.`.

use std::collections::BTreeMap;

use error::AuthError;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;

use crate::base64url;
use crate::claims::{ClaimsProfile, ClaimsSet};
use crate::jwk::KeyMaterial;

type HmacSha256 = Hmac<Sha256>;

pub const ALGORITHM: &str = "HS256";
pub const TOKEN_TYPE: &str = "JWT";

/// JOSE header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    pub alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl TokenHeader {
    /// `{"alg":"HS256","typ":"JWT"}` plus `kid` when one is supplied.
    pub fn hs256(kid: Option<&str>) -> Self {
        Self {
            alg: ALGORITHM.to_string(),
            typ: Some(TOKEN_TYPE.to_string()),
            kid: kid.map(str::to_string),
        }
    }
}

/// A verified token split back into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedToken {
    pub header: TokenHeader,
    pub claims: ClaimsSet,
}

impl DecodedToken {
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.claims.is_expired_at(now)
    }
}

fn new_mac(key: &KeyMaterial) -> Result<HmacSha256, AuthError> {
    if key.is_empty() {
        return Err(AuthError::InvalidKeyMaterial);
    }
    HmacSha256::new_from_slice(key.secret()).map_err(|e| {
        tracing::error!("Failed to create HMAC key: {}", e);
        AuthError::InvalidKeyMaterial
    })
}

/// Encode claims into a signed token.
pub fn encode_token(claims: &ClaimsSet, key: &KeyMaterial) -> Result<String, AuthError> {
    let mut mac = new_mac(key)?;

    let header = serde_json::to_vec(&TokenHeader::hs256(key.kid()))
        .map_err(|e| AuthError::TokenCreationFailed(e.to_string()))?;
    let payload = serde_json::to_vec(&claims.to_map())
        .map_err(|e| AuthError::TokenCreationFailed(e.to_string()))?;

    let signing_input = format!("{}.{}", base64url::encode(header), base64url::encode(payload));
    mac.update(signing_input.as_bytes());
    let signature = mac.finalize().into_bytes();

    Ok(format!("{}.{}", signing_input, base64url::encode(signature)))
}

/// Verify a token's signature and decode its header and claims.
///
/// Expiry is not enforced here; callers check `DecodedToken::is_expired_at`.
pub fn decode_token(token: &str, key: &KeyMaterial) -> Result<DecodedToken, AuthError> {
    let mut mac = new_mac(key)?;

    let (signing_input, signature) = token
        .rsplit_once('.')
        .ok_or_else(|| AuthError::invalid_token("expected three segments"))?;
    let (header_b64, claims_b64) = signing_input
        .split_once('.')
        .filter(|(_, claims)| !claims.contains('.'))
        .ok_or_else(|| AuthError::invalid_token("expected three segments"))?;

    let signature = base64url::decode(signature)
        .map_err(|e| AuthError::invalid_token(format!("signature is not valid base64url: {}", e)))?;
    mac.update(signing_input.as_bytes());
    mac.verify_slice(&signature).map_err(|_| {
        tracing::warn!("Token signature mismatch");
        AuthError::invalid_token("signature mismatch")
    })?;

    let header: TokenHeader = decode_segment(header_b64, "header")?;
    if header.alg != ALGORITHM {
        return Err(AuthError::invalid_token(format!(
            "unsupported algorithm {:?}",
            header.alg
        )));
    }

    let claims: BTreeMap<String, Value> = decode_segment(claims_b64, "claims")?;
    let claims = ClaimsSet::from_map(&claims)?;

    Ok(DecodedToken { header, claims })
}

fn decode_segment<T: serde::de::DeserializeOwned>(
    segment: &str,
    what: &str,
) -> Result<T, AuthError> {
    let bytes = base64url::decode(segment)
        .map_err(|e| AuthError::invalid_token(format!("{} is not valid base64url: {}", what, e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::invalid_token(format!("{} is not valid JSON: {}", what, e)))
}

/// Mints tokens for identities with a fixed key and claims profile.
#[derive(Debug, Clone)]
pub struct TokenMinter {
    key: KeyMaterial,
    profile: ClaimsProfile,
}

impl TokenMinter {
    /// Fails with `InvalidKeyMaterial` on a zero-length key.
    pub fn new(key: KeyMaterial, profile: ClaimsProfile) -> Result<Self, AuthError> {
        if key.is_empty() {
            return Err(AuthError::InvalidKeyMaterial);
        }
        Ok(Self { key, profile })
    }

    pub fn key(&self) -> &KeyMaterial {
        &self.key
    }

    pub fn profile(&self) -> &ClaimsProfile {
        &self.profile
    }

    /// Mint a token valid from `now`.
    pub fn mint_at(&self, identity: &str, now: i64) -> Result<String, AuthError> {
        let claims = self.profile.claims_at(identity, now)?;
        let token = encode_token(&claims, &self.key)?;
        tracing::debug!(
            "Minted token ({}={}, exp={})",
            claims.identity_claim,
            identity,
            claims.exp
        );
        Ok(token)
    }

    /// Mint a token valid from the current time.
    pub fn mint(&self, identity: &str) -> Result<String, AuthError> {
        self.mint_at(identity, chrono::Utc::now().timestamp())
    }

    /// Verify a token against this minter's key.
    pub fn verify(&self, token: &str) -> Result<DecodedToken, AuthError> {
        decode_token(token, &self.key)
    }
}
