//! ejabberd HTTP admin API client
//!
//! Thin wrapper over `reqwest` that turns every call into either a
//! 200 response or a categorized [`ProbeFailure`].

use std::fmt;
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::commands::ApiCommand;
use crate::config::ProbeConfig;

/// Errors that can occur while building the client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Categorized failure of a single request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not read response: {0}")]
    Decode(String),
}

impl ProbeFailure {
    /// True when the server answered, just not with 200.
    pub fn is_http_status(&self) -> bool {
        matches!(self, Self::Status { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ProbeFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else if err.is_decode() || err.is_body() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Error body returned by mod_http_api
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    pub status: String,
    pub code: i64,
    pub message: String,
}

/// A 200 response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub body: String,
}

impl ProbeResponse {
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, ProbeFailure> {
        serde_json::from_str(&self.body).map_err(|e| ProbeFailure::Decode(e.to_string()))
    }

    /// First `max` characters of the body, on one line.
    pub fn snippet(&self, max: usize) -> String {
        snippet(&self.body, max)
    }
}

pub(crate) fn snippet(body: &str, max: usize) -> String {
    body.chars()
        .take(max)
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Parse an ejabberd error body, if that is what `body` is.
pub fn parse_api_error(body: &str) -> Option<ApiError> {
    serde_json::from_str::<ApiError>(body)
        .ok()
        .filter(|e| e.status == "error")
}

/// How a request authenticates
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    None,
    Basic { user: String, password: String },
    Bearer(String),
}

impl Credentials {
    pub fn basic(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer(token.into())
    }

    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::None => request,
            Self::Basic { user, password } => request.basic_auth(user, Some(password)),
            Self::Bearer(token) => request.bearer_auth(token),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Basic { .. } => "basic",
            Self::Bearer(_) => "bearer",
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Basic { user, .. } => {
                f.debug_struct("Basic").field("user", user).finish_non_exhaustive()
            }
            Self::Bearer(_) => f.write_str("Bearer(<redacted>)"),
        }
    }
}

/// Admin API client
pub struct AdminClient {
    client: Client,
    base_url: String,
}

impl AdminClient {
    /// Create a client for `base_url` with a fixed per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ejabberd-probe/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ProbeConfig) -> Result<Self, ClientError> {
        Self::new(config.base_url(), config.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `GET <path>`
    pub async fn get(
        &self,
        path: &str,
        credentials: &Credentials,
    ) -> Result<ProbeResponse, ProbeFailure> {
        let url = self.url(path);
        tracing::debug!("GET {} (auth: {})", url, credentials.kind());
        self.send(credentials.apply(self.client.get(&url))).await
    }

    /// `POST /api/<command>` with a JSON body
    pub async fn call<B: Serialize + ?Sized>(
        &self,
        command: &str,
        body: &B,
        credentials: &Credentials,
    ) -> Result<ProbeResponse, ProbeFailure> {
        let url = self.url(&format!("api/{}", command));
        tracing::debug!("POST {} (auth: {})", url, credentials.kind());
        self.send(credentials.apply(self.client.post(&url)).json(body))
            .await
    }

    /// Issue a typed admin command
    pub async fn command<C: ApiCommand>(
        &self,
        command: &C,
        credentials: &Credentials,
    ) -> Result<ProbeResponse, ProbeFailure> {
        self.call(C::NAME, command, credentials).await
    }

    async fn send(&self, request: RequestBuilder) -> Result<ProbeResponse, ProbeFailure> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        if status != 200 {
            tracing::debug!("Server returned {}: {}", status, snippet(&body, 200));
            return Err(ProbeFailure::Status { status, body });
        }

        Ok(ProbeResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let client = AdminClient::new("http://localhost:5280/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:5280");
        assert_eq!(client.url("/api/"), "http://localhost:5280/api/");
        assert_eq!(client.url("admin/"), "http://localhost:5280/admin/");
    }

    #[test]
    fn test_parse_api_error() {
        let err = parse_api_error(r#"{"status":"error","code":10,"message":"Room already exists"}"#)
            .unwrap();
        assert_eq!(err.code, 10);
        assert_eq!(err.message, "Room already exists");

        assert!(parse_api_error("0").is_none());
        assert!(parse_api_error("Unauthorized").is_none());
    }

    #[test]
    fn test_snippet() {
        assert_eq!(snippet("line one\nline two", 100), "line one line two");
        assert_eq!(snippet("abcdef", 3), "abc");
    }

    #[test]
    fn test_credentials_debug_redacts() {
        let rendered = format!(
            "{:?} {:?}",
            Credentials::basic("admin@localhost", "pw"),
            Credentials::bearer("token")
        );
        assert!(rendered.contains("admin@localhost"));
        assert!(!rendered.contains("pw\""));
        assert!(!rendered.contains("token\""));
    }

    #[test]
    fn test_failure_status() {
        let failure = ProbeFailure::Status {
            status: 401,
            body: String::new(),
        };
        assert!(failure.is_http_status());
        assert_eq!(failure.status(), Some(401));
        assert_eq!(ProbeFailure::Timeout.status(), None);
    }
}
