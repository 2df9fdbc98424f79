use std::time::Duration;

use auth::{AuthError, ClaimsProfile, Jid, KeyMaterial, TokenMinter};
use error::ConfigError;

/// Environment variable holding the base64 JWK blob. Has no default.
pub const JWK_ENV: &str = "JWT_JWK_B64";

/// Probe configuration, built once at startup and passed to every probe.
#[derive(Clone)]
pub struct ProbeConfig {
    /// `http` or `https`
    pub scheme: String,

    /// ejabberd HTTP listener host
    pub host: String,

    /// ejabberd HTTP listener port
    pub port: u16,

    /// XMPP virtual host
    pub domain: String,

    /// Local part of the test user
    pub user: String,

    /// Password used when registering the test user
    pub user_password: Option<String>,

    /// MUC room name
    pub room: String,

    /// MUC service JID, defaults to `conference.<domain>`
    pub muc_service: Option<String>,

    /// Admin JID for HTTP Basic auth, defaults to `admin@<domain>`
    pub admin_user: Option<String>,

    /// Admin password; Basic-auth probes are skipped without it
    pub admin_password: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Base64-encoded JWK blob
    pub jwk_b64: String,

    /// Claims minted into the probe token
    pub claims_profile: ClaimsProfile,
}

impl ProbeConfig {
    /// Configuration with default endpoints around a mandatory key blob.
    pub fn new(jwk_b64: impl Into<String>) -> Self {
        Self {
            scheme: "http".to_string(),
            host: "localhost".to_string(),
            port: 5280,
            domain: "ejabberd.local".to_string(),
            user: "test".to_string(),
            user_password: None,
            room: "testroom".to_string(),
            muc_service: None,
            admin_user: None,
            admin_password: None,
            timeout_secs: 5,
            jwk_b64: jwk_b64.into(),
            claims_profile: ClaimsProfile::xmpp(),
        }
    }

    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let jwk_b64 =
            var(JWK_ENV).ok_or_else(|| ConfigError::MissingVariable(JWK_ENV.to_string()))?;
        let mut config = Self::new(jwk_b64);

        if let Some(scheme) = var("EJABBERD_SCHEME") {
            config.scheme = scheme;
        }

        if let Some(host) = var("EJABBERD_HOST") {
            config.host = host;
        }

        if let Some(port) = var("EJABBERD_PORT") {
            config.port = parse_var("EJABBERD_PORT", &port)?;
        }

        if let Some(domain) = var("EJABBERD_DOMAIN") {
            config.domain = domain;
        }

        if let Some(user) = var("EJABBERD_USER") {
            config.user = user;
        }

        config.user_password = var("EJABBERD_USER_PASSWORD");

        if let Some(room) = var("EJABBERD_ROOM") {
            config.room = room;
        }

        config.muc_service = var("EJABBERD_MUC_SERVICE");
        config.admin_user = var("EJABBERD_ADMIN_USER");
        config.admin_password = var("EJABBERD_ADMIN_PASSWORD");

        if let Some(timeout) = var("EJABBERD_TIMEOUT_SECS") {
            config.timeout_secs = parse_var("EJABBERD_TIMEOUT_SECS", &timeout)?;
        }

        if let Some(profile) = var("JWT_CLAIM_PROFILE") {
            config.claims_profile = profile.parse().map_err(|_| ConfigError::InvalidValue {
                name: "JWT_CLAIM_PROFILE".to_string(),
                value: profile.clone(),
            })?;
        }

        if let Some(issuer) = var("JWT_ISSUER") {
            if config.claims_profile.issuer.is_some() {
                config.claims_profile.issuer = Some(issuer);
            }
        }

        if let Some(ttl) = var("JWT_TOKEN_TTL_SECS") {
            let secs: i64 = parse_var("JWT_TOKEN_TTL_SECS", &ttl)?;
            if secs <= 0 {
                return Err(ConfigError::InvalidValue {
                    name: "JWT_TOKEN_TTL_SECS".to_string(),
                    value: ttl,
                });
            }
            config.claims_profile = config.claims_profile.with_validity(secs);
        }

        Ok(config)
    }

    /// Point the probes at another listener.
    pub fn with_endpoint(
        mut self,
        scheme: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        self.scheme = scheme.into();
        self.host = host.into();
        self.port = port;
        self
    }

    pub fn with_admin_password(mut self, password: impl Into<String>) -> Self {
        self.admin_password = Some(password.into());
        self
    }

    pub fn with_user_password(mut self, password: impl Into<String>) -> Self {
        self.user_password = Some(password.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Base URL of the HTTP listener, without trailing slash.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn muc_service(&self) -> String {
        self.muc_service
            .clone()
            .unwrap_or_else(|| format!("conference.{}", self.domain))
    }

    pub fn admin_user(&self) -> String {
        self.admin_user
            .clone()
            .unwrap_or_else(|| format!("admin@{}", self.domain))
    }

    /// `user@domain` of the test user.
    pub fn user_jid(&self) -> Result<Jid, AuthError> {
        Jid::new(&self.user, &self.domain)
    }

    /// `room@muc_service`.
    pub fn room_jid(&self) -> String {
        format!("{}@{}", self.room, self.muc_service())
    }

    pub fn key_material(&self) -> Result<KeyMaterial, AuthError> {
        KeyMaterial::from_jwk_b64(&self.jwk_b64)
    }

    pub fn token_minter(&self) -> Result<TokenMinter, AuthError> {
        TokenMinter::new(self.key_material()?, self.claims_profile.clone())
    }
}

impl std::fmt::Debug for ProbeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeConfig")
            .field("base_url", &self.base_url())
            .field("domain", &self.domain)
            .field("user", &self.user)
            .field("room", &self.room)
            .field("muc_service", &self.muc_service())
            .field("admin_user", &self.admin_user())
            .field("admin_password", &self.admin_password.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("claims_profile", &self.claims_profile)
            .finish_non_exhaustive()
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    })
}
