//! Shared reqwest client
//!
//! Both adapters go through [`HttpClient`], which owns the connection pool,
//! attaches the bearer token and turns every non-2xx response into a
//! [`PortError`]:
//!
//! - 401/403 -> `PortError::Unauthorized`
//! - 404 -> `PortError::NotFound`
//! - 409 -> `PortError::Conflict`
//! - 429 -> `PortError::RateLimited`
//! - 5xx -> `PortError::ServiceUnavailable`
//! - any other status -> `PortError::Rejected`
//! - timeouts -> `PortError::Timeout`
//! - undecodable bodies -> `PortError::Transformation`
//!
//! When the body is `{ "error": "..." }` the string is kept on the variants
//! that carry a message, so the UI can show it verbatim.

use chrono::Utc;
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use core_kernel::{AdapterHealth, HealthCheckResult, PortError};

use crate::config::{ConfigError, HttpAdapterConfig};

const DEFAULT_RETRY_AFTER_SECS: u64 = 1;
const SERVICE_NAME: &str = "claim-guide-api";

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// JSON-over-HTTP client bound to one collaborator
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    config: HttpAdapterConfig,
}

impl HttpClient {
    pub fn new(config: HttpAdapterConfig) -> Result<Self, ConfigError> {
        let base = config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ConfigError::ClientBuild { reason: e.to_string() })?;

        Ok(Self {
            client,
            base_url: base.as_str().trim_end_matches('/').to_string(),
            config,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, PortError> {
        let operation = format!("GET {}", path);
        let response = self.execute(self.request(Method::GET, path), &operation).await?;
        decode(response, &operation).await
    }

    /// Like [`get_json`](Self::get_json), but a 404 is `Ok(None)`
    pub async fn get_optional<R: DeserializeOwned>(&self, path: &str) -> Result<Option<R>, PortError> {
        match self.get_json(path).await {
            Ok(value) => Ok(Some(value)),
            Err(PortError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn send_json<B, R>(&self, method: Method, path: &str, body: &B) -> Result<R, PortError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let operation = format!("{} {}", method, path);
        let response = self
            .execute(self.request(method, path).json(body), &operation)
            .await?;
        decode(response, &operation).await
    }

    /// Sends a request whose response body is ignored
    pub async fn send_unit<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<(), PortError>
    where
        B: Serialize + ?Sized,
    {
        let operation = format!("{} {}", method, path);
        let builder = match body {
            Some(body) => self.request(method, path).json(body),
            None => self.request(method, path),
        };
        self.execute(builder, &operation).await.map(|_| ())
    }

    /// Raw PUT to a signed storage URL; no bearer token is attached
    pub async fn put_bytes(&self, upload_url: &str, content_type: &str, bytes: Vec<u8>) -> Result<(), PortError> {
        let builder = self
            .client
            .put(upload_url)
            .header(CONTENT_TYPE, content_type)
            .body(bytes);
        self.execute(builder, "PUT signed upload URL").await.map(|_| ())
    }

    /// Probes `GET /health`
    pub async fn health(&self, adapter_id: &str) -> HealthCheckResult {
        let started = Instant::now();
        let (status, message) = match self.client.get(self.url("/health")).send().await {
            Ok(response) if response.status().is_success() => (AdapterHealth::Healthy, None),
            Ok(response) => (
                AdapterHealth::Degraded,
                Some(format!("Health endpoint returned {}", response.status())),
            ),
            Err(e) => (AdapterHealth::Unhealthy, Some(e.to_string())),
        };

        HealthCheckResult {
            adapter_id: adapter_id.to_string(),
            status,
            latency_ms: started.elapsed().as_millis() as u64,
            message,
            checked_at: Utc::now(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.config.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn execute(&self, builder: RequestBuilder, operation: &str) -> Result<Response, PortError> {
        let started = Instant::now();
        let response = builder
            .send()
            .await
            .map_err(|e| self.transport_error(e, operation))?;

        let status = response.status();
        debug!(
            operation,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "HTTP response"
        );
        if status.is_success() {
            return Ok(response);
        }
        Err(error_from_response(response, operation).await)
    }

    fn transport_error(&self, error: reqwest::Error, operation: &str) -> PortError {
        if error.is_timeout() {
            return PortError::Timeout {
                operation: operation.to_string(),
                duration_ms: self.config.timeout().as_millis() as u64,
            };
        }
        PortError::Connection {
            message: format!("{} failed: {}", operation, error),
            source: Some(Box::new(error)),
        }
    }
}

/// Maps a non-2xx status and the server's `error` string onto a [`PortError`]
pub fn map_status(
    status: StatusCode,
    message: Option<String>,
    retry_after_secs: Option<u64>,
    resource: &str,
) -> PortError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PortError::Unauthorized { message },
        StatusCode::NOT_FOUND => PortError::not_found("resource", resource),
        StatusCode::CONFLICT => PortError::Conflict { message },
        StatusCode::TOO_MANY_REQUESTS => PortError::RateLimited {
            retry_after_secs: retry_after_secs.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        s if s.is_server_error() => PortError::ServiceUnavailable {
            service: SERVICE_NAME.to_string(),
            message,
        },
        s => PortError::Rejected {
            status: s.as_u16(),
            message,
        },
    }
}

async fn error_from_response(response: Response, operation: &str) -> PortError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    // Non-JSON error bodies simply carry no message
    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.error);

    map_status(status, message, retry_after, operation)
}

async fn decode<R: DeserializeOwned>(response: Response, operation: &str) -> Result<R, PortError> {
    let bytes = response.bytes().await.map_err(|e| PortError::Connection {
        message: format!("{}: body could not be read", operation),
        source: Some(Box::new(e)),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| PortError::Transformation {
        message: format!("{}: {}", operation, e),
    })
}
