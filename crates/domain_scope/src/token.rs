//! Contractor access tokens
//!
//! The claim owner's invite issues a token that scopes every wizard call.
//! Tokens are valid for [`TOKEN_VALIDITY_DAYS`] and stop working once the
//! scope sheet has been submitted.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::WizardError;

pub const TOKEN_VALIDITY_DAYS: i64 = 7;

/// Opaque token from the invite link
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Accepts a non-empty, URL-safe token
    pub fn parse(raw: &str) -> Result<Self, WizardError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(WizardError::validation("Access token is missing"));
        }
        if !raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(WizardError::validation("Access token is malformed"));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Enough to correlate logs without leaking the credential
        let prefix: String = self.0.chars().take(6).collect();
        write!(f, "{}…", prefix)
    }
}

/// A token and its expiry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractorToken {
    pub token: AccessToken,
    pub expires_at: DateTime<Utc>,
}

impl ContractorToken {
    pub fn issue(now: DateTime<Utc>) -> Self {
        Self {
            token: AccessToken(Uuid::new_v4().simple().to_string()),
            expires_at: now + Duration::days(TOKEN_VALIDITY_DAYS),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Why a token was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenRejection {
    Expired,
    NotFound,
    Completed,
}

impl fmt::Display for TokenRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenRejection::Expired => write!(f, "expired"),
            TokenRejection::NotFound => write!(f, "not valid"),
            TokenRejection::Completed => write!(f, "already used; the scope sheet was submitted"),
        }
    }
}

/// Token validation result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenValidation {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<TokenRejection>,
}

impl TokenValidation {
    pub fn valid() -> Self {
        Self { valid: true, reason: None }
    }

    pub fn rejected(reason: TokenRejection) -> Self {
        Self { valid: false, reason: Some(reason) }
    }

    /// An invalid result without a reason is treated as not found
    pub fn into_result(self) -> Result<(), WizardError> {
        if self.valid {
            Ok(())
        } else {
            Err(WizardError::TokenRejected(self.reason.unwrap_or(TokenRejection::NotFound)))
        }
    }
}
