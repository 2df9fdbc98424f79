//! JWT claims and the profiles used to mint them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use error::AuthError;
use serde_json::Value;

/// Claim name that carries the user identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentityClaim {
    /// `sub`, as used by the middleware tokens
    #[default]
    Sub,
    /// `jid`, ejabberd's default `jwt_jid_field`
    Jid,
}

impl IdentityClaim {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sub => "sub",
            Self::Jid => "jid",
        }
    }
}

impl fmt::Display for IdentityClaim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bare `user@domain` identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Jid(String);

impl Jid {
    /// Join a local part and a domain.
    pub fn new(user: &str, domain: &str) -> Result<Self, AuthError> {
        if user.is_empty() || domain.is_empty() {
            return Err(AuthError::TokenCreationFailed(
                "identity needs both a user and a domain".to_string(),
            ));
        }
        if user.contains('@') || domain.contains('@') {
            return Err(AuthError::TokenCreationFailed(format!(
                "identity parts must not contain '@': {:?} / {:?}",
                user, domain
            )));
        }
        Ok(Self(format!("{}@{}", user, domain)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Jid> for String {
    fn from(jid: Jid) -> Self {
        jid.0
    }
}

/// JWT claims set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimsSet {
    /// Which claim name holds `identity`
    pub identity_claim: IdentityClaim,
    /// `user@domain`
    pub identity: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issuer
    pub iss: Option<String>,
    /// Issued at (Unix timestamp)
    pub iat: Option<i64>,
    /// Not before (Unix timestamp)
    pub nbf: Option<i64>,
}

impl ClaimsSet {
    /// Minimal claims: identity and absolute expiry.
    pub fn new(identity_claim: IdentityClaim, identity: impl Into<String>, exp: i64) -> Self {
        Self {
            identity_claim,
            identity: identity.into(),
            exp,
            iss: None,
            iat: None,
            nbf: None,
        }
    }

    pub fn with_issuer(self, iss: impl Into<String>) -> Self {
        Self {
            iss: Some(iss.into()),
            ..self
        }
    }

    pub fn with_issued_at(self, iat: i64) -> Self {
        Self {
            iat: Some(iat),
            ..self
        }
    }

    pub fn with_not_before(self, nbf: i64) -> Self {
        Self {
            nbf: Some(nbf),
            ..self
        }
    }

    /// Check if the claims have expired at `now`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }

    /// Check if the claims have expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now().timestamp())
    }

    /// Flatten into the JSON object that gets signed.
    pub fn to_map(&self) -> BTreeMap<String, Value> {
        let mut map = BTreeMap::new();
        map.insert(
            self.identity_claim.as_str().to_string(),
            Value::from(self.identity.as_str()),
        );
        map.insert("exp".to_string(), Value::from(self.exp));
        if let Some(iss) = &self.iss {
            map.insert("iss".to_string(), Value::from(iss.as_str()));
        }
        if let Some(iat) = self.iat {
            map.insert("iat".to_string(), Value::from(iat));
        }
        if let Some(nbf) = self.nbf {
            map.insert("nbf".to_string(), Value::from(nbf));
        }
        map
    }

    /// Rebuild claims from a decoded JSON object.
    ///
    /// `jid` wins when both identity claims are present, matching how
    /// ejabberd is configured for these deployments.
    pub fn from_map(map: &BTreeMap<String, Value>) -> Result<Self, AuthError> {
        let (identity_claim, identity) = [IdentityClaim::Jid, IdentityClaim::Sub]
            .into_iter()
            .find_map(|claim| {
                map.get(claim.as_str())
                    .and_then(|v| v.as_str())
                    .map(|s| (claim, s.to_string()))
            })
            .ok_or_else(|| AuthError::invalid_token("no `jid` or `sub` claim"))?;

        let exp = map
            .get("exp")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| AuthError::invalid_token("missing or non-integer `exp`"))?;

        let iss = map.get("iss").and_then(|v| v.as_str()).map(str::to_string);
        let iat = map.get("iat").and_then(|v| v.as_i64());
        let nbf = map.get("nbf").and_then(|v| v.as_i64());

        Ok(Self {
            identity_claim,
            identity,
            exp,
            iss,
            iat,
            nbf,
        })
    }
}

/// How to mint a claims set for an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimsProfile {
    pub identity_claim: IdentityClaim,
    pub validity_secs: i64,
    pub issuer: Option<String>,
    /// Also set `iat` and `nbf` to the minting time.
    pub timestamps: bool,
}

impl ClaimsProfile {
    /// One hour
    pub const XMPP_VALIDITY_SECS: i64 = 3600;
    /// 24 hours
    pub const MIDDLEWARE_VALIDITY_SECS: i64 = 24 * 3600;
    pub const DEFAULT_ISSUER: &'static str = "middleware-app";

    /// `jid` + `exp`, valid for one hour.
    pub fn xmpp() -> Self {
        Self {
            identity_claim: IdentityClaim::Jid,
            validity_secs: Self::XMPP_VALIDITY_SECS,
            issuer: None,
            timestamps: false,
        }
    }

    /// `sub` + `exp` + `iss` + `iat` + `nbf`, valid for 24 hours.
    pub fn middleware(issuer: impl Into<String>) -> Self {
        Self {
            identity_claim: IdentityClaim::Sub,
            validity_secs: Self::MIDDLEWARE_VALIDITY_SECS,
            issuer: Some(issuer.into()),
            timestamps: true,
        }
    }

    pub fn with_validity(self, validity_secs: i64) -> Self {
        Self {
            validity_secs,
            ..self
        }
    }

    /// Claims minted at a fixed `now`.
    ///
    /// Fails when the validity is not positive or `exp` would overflow.
    pub fn claims_at(
        &self,
        identity: impl Into<String>,
        now: i64,
    ) -> Result<ClaimsSet, AuthError> {
        if self.validity_secs <= 0 {
            return Err(AuthError::TokenCreationFailed(format!(
                "validity must be positive, got {}s",
                self.validity_secs
            )));
        }
        let exp = now.checked_add(self.validity_secs).ok_or_else(|| {
            AuthError::TokenCreationFailed(format!(
                "validity of {}s overflows the expiry timestamp",
                self.validity_secs
            ))
        })?;

        let mut claims = ClaimsSet::new(self.identity_claim, identity, exp);
        if let Some(iss) = &self.issuer {
            claims = claims.with_issuer(iss.clone());
        }
        if self.timestamps {
            claims = claims.with_issued_at(now).with_not_before(now);
        }
        Ok(claims)
    }

    /// Claims minted against the system clock.
    pub fn claims_now(&self, identity: impl Into<String>) -> Result<ClaimsSet, AuthError> {
        self.claims_at(identity, chrono::Utc::now().timestamp())
    }
}

impl Default for ClaimsProfile {
    fn default() -> Self {
        Self::xmpp()
    }
}

impl FromStr for ClaimsProfile {
    type Err = String;

    /// `xmpp` or `middleware`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xmpp" | "jid" => Ok(Self::xmpp()),
            "middleware" | "sub" => Ok(Self::middleware(Self::DEFAULT_ISSUER)),
            other => Err(format!(
                "unknown claims profile {:?} (expected `xmpp` or `middleware`)",
                other
            )),
        }
    }
}
