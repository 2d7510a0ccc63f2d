//! Client configuration

use serde::Deserialize;
use std::time::Duration;

use infra_http::{HttpAdapterConfig, DEFAULT_TIMEOUT_SECS};

/// Environment prefix; `CLAIM_GUIDE_BASE_URL` sets `base_url`, and so on
pub const ENV_PREFIX: &str = "CLAIM_GUIDE";

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Collaborator root URL
    pub base_url: String,
    /// Claim owner's bearer token
    pub api_token: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Parse-status poll interval in seconds
    pub poll_interval_secs: u64,
    /// Log level
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            api_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            poll_interval_secs: 3,
            log_level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    /// Loads configuration from `CLAIM_GUIDE_*` environment variables
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_source(config::Environment::with_prefix(ENV_PREFIX))
    }

    /// Loads configuration from any source, falling back to defaults per field
    pub fn from_source<S>(source: S) -> Result<Self, config::ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn adapter_config(&self) -> HttpAdapterConfig {
        let config = HttpAdapterConfig::new(self.base_url.clone()).with_timeout_secs(self.timeout_secs);
        match &self.api_token {
            Some(token) => config.with_api_token(token.clone()),
            None => config,
        }
    }
}
