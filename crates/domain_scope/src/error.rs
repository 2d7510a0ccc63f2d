//! Scope-sheet wizard errors

use thiserror::Error;

use core_kernel::{PortError, ScopeAreaId};
use crate::token::TokenRejection;
use crate::wizard::WizardPhase;

/// Errors that can occur in the contractor wizard
#[derive(Debug, Error)]
pub enum WizardError {
    #[error("Cannot {action} from the {phase} phase")]
    InvalidTransition {
        action: &'static str,
        phase: WizardPhase,
    },

    #[error("Select at least one area to inspect")]
    NoCategoriesSelected,

    #[error("Unknown area category: {0}")]
    UnknownCategory(String),

    /// Re-running triage would drop areas that already hold data
    #[error("Rebuilding the tour discards data in: {}", .areas.join(", "))]
    RebuildNeedsConfirmation { areas: Vec<String> },

    #[error("Area {0} is not part of this tour")]
    UnknownArea(ScopeAreaId),

    #[error("{0}")]
    Validation(String),

    #[error("This link is {0}")]
    TokenRejected(TokenRejection),

    /// The packed draft step only has room for a limited tour length
    #[error("Tour index {0} cannot be encoded")]
    EncodingOutOfRange(usize),

    #[error("The scope sheet is already being submitted")]
    SubmissionInFlight,

    #[error("The scope sheet has already been submitted")]
    AlreadySubmitted,

    /// A remote call failed; `message` is what the contractor sees
    #[error("{message}")]
    Remote {
        action: &'static str,
        message: String,
        #[source]
        source: PortError,
    },
}

impl WizardError {
    /// Wraps a port failure, keeping the server's message or `fallback`
    pub fn remote(action: &'static str, fallback: &str, source: PortError) -> Self {
        WizardError::Remote {
            action,
            message: source.user_message(fallback),
            source,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        WizardError::Validation(message.into())
    }
}
