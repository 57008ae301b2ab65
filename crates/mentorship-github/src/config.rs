//! Connection settings for the GitHub GraphQL API.

use std::fmt;

pub const DEFAULT_ENDPOINT: &str = "https://api.github.com/graphql";
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const ENDPOINT_ENV: &str = "GITHUB_GRAPHQL_URL";

/// An opaque bearer token. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub endpoint: String,
    pub credential: Credential,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl GithubConfig {
    pub fn new(credential: Credential) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            credential,
            user_agent: concat!("mentorship/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 30,
        }
    }

    /// An explicit token wins over `GITHUB_TOKEN`; a blank one counts as missing.
    ///
    /// `GITHUB_GRAPHQL_URL`, when set, overrides the endpoint.
    pub fn resolve(token: Option<String>) -> Result<Self, ConfigError> {
        let token = token
            .or_else(|| std::env::var(TOKEN_ENV).ok())
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingToken)?;

        let mut config = Self::new(Credential::new(token));
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            config = config.with_endpoint(endpoint)?;
        }
        Ok(config)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Result<Self, ConfigError> {
        let endpoint = endpoint.into();
        let endpoint = endpoint.trim();
        if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
            return Err(ConfigError::Invalid(format!(
                "endpoint must be an http(s) URL, got `{endpoint}`"
            )));
        }
        self.endpoint = endpoint.to_string();
        Ok(self)
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No GitHub token configured. Pass --token or set {TOKEN_ENV}")]
    MissingToken,
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
