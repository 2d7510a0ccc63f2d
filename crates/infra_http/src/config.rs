//! Adapter configuration

use reqwest::Url;
use std::time::Duration;
use thiserror::Error;

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors raised while validating an [`HttpAdapterConfig`]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Timeout must be at least one second")]
    ZeroTimeout,

    #[error("Could not build the HTTP client: {reason}")]
    ClientBuild { reason: String },
}

/// Connection settings shared by both adapters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpAdapterConfig {
    /// Collaborator root, e.g. `https://api.claimguide.test`
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Sent as the `User-Agent` header
    pub user_agent: String,

    /// Bearer token for the claim owner's session; the contractor
    /// wizard authenticates through the access token in the path instead
    pub api_token: Option<String>,
}

impl Default for HttpAdapterConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: concat!("claim-guide/", env!("CARGO_PKG_VERSION")).to_string(),
            api_token: None,
        }
    }
}

impl HttpAdapterConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Checks the settings and returns the parsed base URL
    pub fn validate(&self) -> Result<Url, ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        let url = Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.base_url.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        Ok(url)
    }
}
