//! HTTP Infrastructure Layer
//!
//! reqwest-backed adapters for the two domain ports:
//!
//! - [`HttpClaimFilingAdapter`] implements `domain_claims::ClaimFilingPort`
//! - [`HttpScopeSheetAdapter`] implements `domain_scope::ScopeSheetPort`
//!
//! Both share one [`HttpClient`], which maps HTTP statuses and the
//! collaborator's `{ "error": ... }` bodies onto `core_kernel::PortError`.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_http::{HttpAdapterConfig, HttpClaimFilingAdapter};
//!
//! let config = HttpAdapterConfig::new("https://api.claimguide.test").with_api_token(token);
//! let port = Arc::new(HttpClaimFilingAdapter::new(config)?);
//! let controller = StepProgressionController::load(port, claim_id).await?;
//! ```

pub mod claims;
pub mod client;
pub mod config;
pub mod scope;

pub use claims::HttpClaimFilingAdapter;
pub use client::{map_status, HttpClient};
pub use config::{ConfigError, HttpAdapterConfig, DEFAULT_TIMEOUT_SECS};
pub use scope::HttpScopeSheetAdapter;
