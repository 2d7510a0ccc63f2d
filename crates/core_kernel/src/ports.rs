//! Ports and Adapters Infrastructure
//!
//! The claim filing flow and the contractor wizard never talk to the network
//! directly. Each domain defines a port trait describing the remote calls it
//! needs; adapters implement it either over HTTP (`infra_http`) or in memory
//! (the `mock` modules used by tests).
//!
//! ```text
//! ┌──────────────────────────────┐   ┌──────────────────────────────┐
//! │  StepProgressionController   │   │        WizardSession         │
//! └──────────────┬───────────────┘   └──────────────┬───────────────┘
//!                ▼                                  ▼
//!        ClaimFilingPort                     ScopeSheetPort
//!         ▲          ▲                        ▲          ▲
//!   HTTP adapter   mock                HTTP adapter   mock
//! ```
//!
//! Every port reports failures through [`PortError`], which keeps the
//! server-provided `error` string when the collaborator sent one so the UI
//! can surface it verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error type for port operations
#[derive(Debug, Error)]
pub enum PortError {
    /// The requested entity was not found
    #[error("Not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: String,
        id: String,
    },

    /// The collaborator refused the input
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// The collaborator rejected the request for a reason of its own
    #[error("Request rejected with status {status}{}", display_message(.message))]
    Rejected {
        status: u16,
        message: Option<String>,
    },

    /// The operation conflicts with existing data (e.g. a stale draft revision)
    #[error("Conflict{}", display_message(.message))]
    Conflict {
        message: Option<String>,
    },

    /// Authentication or authorization failed
    #[error("Unauthorized{}", display_message(.message))]
    Unauthorized {
        message: Option<String>,
    },

    /// Connection to the collaborator failed
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The operation timed out
    #[error("Timeout after {duration_ms}ms: {operation}")]
    Timeout {
        operation: String,
        duration_ms: u64,
    },

    /// Rate limit exceeded
    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited {
        retry_after_secs: u64,
    },

    /// The collaborator is unavailable
    #[error("Service unavailable: {service}{}", display_message(.message))]
    ServiceUnavailable {
        service: String,
        message: Option<String>,
    },

    /// A response could not be decoded
    #[error("Transformation error: {message}")]
    Transformation {
        message: String,
    },

    /// An internal error occurred
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

fn display_message(message: &Option<String>) -> String {
    match message {
        Some(message) => format!(": {}", message),
        None => String::new(),
    }
}

impl PortError {
    /// Creates a NotFound error
    pub fn not_found(entity_type: impl Into<String>, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        PortError::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Creates a Rejected error carrying the server's explanation
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        PortError::Rejected {
            status,
            message: Some(message.into()),
        }
    }

    /// Creates a Conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        PortError::Conflict {
            message: Some(message.into()),
        }
    }

    /// Creates a Connection error
    pub fn connection(message: impl Into<String>) -> Self {
        PortError::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        PortError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true if this error indicates a transient failure that may succeed on retry
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PortError::Connection { .. }
                | PortError::Timeout { .. }
                | PortError::RateLimited { .. }
                | PortError::ServiceUnavailable { .. }
        )
    }

    /// Returns true if this error indicates the entity was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound { .. })
    }

    /// The `error` string the collaborator supplied, if any
    pub fn server_message(&self) -> Option<&str> {
        match self {
            PortError::Validation { message, .. } => Some(message.as_str()),
            PortError::Rejected { message, .. }
            | PortError::Conflict { message }
            | PortError::Unauthorized { message }
            | PortError::ServiceUnavailable { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Message to show the user: the server's own string, else `fallback`
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message()
            .filter(|message| !message.trim().is_empty())
            .unwrap_or(fallback)
            .to_string()
    }
}

/// Marker trait for all domain ports
///
/// Ports are shared between the foreground flow and background tasks
/// (parse polling, draft persistence), so they must be thread-safe.
pub trait DomainPort: Send + Sync + 'static {}

/// Health status for an adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterHealth {
    /// Adapter is healthy and operational
    Healthy,
    /// Adapter is degraded but operational
    Degraded,
    /// Adapter is unhealthy and not operational
    Unhealthy,
    /// Health status is unknown
    Unknown,
}

/// Health check result for an adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    /// Adapter identifier
    pub adapter_id: String,
    /// Current health status
    pub status: AdapterHealth,
    /// Latency of the health check in milliseconds
    pub latency_ms: u64,
    /// Optional message with additional details
    pub message: Option<String>,
    /// Timestamp of the health check
    pub checked_at: DateTime<Utc>,
}

/// Trait for adapters that support health checks
#[async_trait::async_trait]
pub trait HealthCheckable: Send + Sync {
    /// Performs a health check on the adapter
    async fn health_check(&self) -> HealthCheckResult;
}
