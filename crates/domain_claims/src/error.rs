//! Claim filing errors

use thiserror::Error;

use core_kernel::PortError;
use crate::payment::PaymentType;
use crate::step::FilingStep;

/// Errors that can occur in the claim filing flow
#[derive(Debug, Error)]
pub enum FilingError {
    /// The step is neither completed nor current; its controls are inert
    #[error("Step {0} is locked")]
    StepLocked(FilingStep),

    #[error("Invalid step number: {0}")]
    InvalidStep(u8),

    /// Client-side validation; no remote call was made
    #[error("{0}")]
    Validation(String),

    /// A remote call failed; `message` is what the user sees
    #[error("{message}")]
    Remote {
        action: &'static str,
        message: String,
        #[source]
        source: PortError,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("{0} payment already recorded")]
    PaymentAlreadyRecorded(PaymentType),

    #[error("Claim is closed")]
    ClaimClosed,
}

impl FilingError {
    /// Wraps a port failure, keeping the server's message or `fallback`
    pub fn remote(action: &'static str, fallback: &str, source: PortError) -> Self {
        FilingError::Remote {
            action,
            message: source.user_message(fallback),
            source,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        FilingError::Validation(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        FilingError::InvalidState(message.into())
    }

    /// True for errors raised before any remote call
    pub fn is_client_side(&self) -> bool {
        matches!(
            self,
            FilingError::StepLocked(_)
                | FilingError::InvalidStep(_)
                | FilingError::Validation(_)
                | FilingError::InvalidState(_)
                | FilingError::PaymentAlreadyRecorded(_)
                | FilingError::ClaimClosed
        )
    }
}
