//! Scope Sheet Domain
//!
//! The contractor's damage-assessment wizard. A contractor opens the invite
//! link, selects the damaged areas in triage, inspects each one in a guided
//! tour, then reviews and submits the scope sheet.
//!
//! # Wizard Phases
//!
//! ```text
//! Welcome -> Triage -> Tour(0..n) -> Review -> (submitted)
//! ```
//!
//! Progress is saved as a draft after every transition so the contractor can
//! resume later from the same link.

pub mod area;
pub mod catalog;
pub mod draft;
pub mod encoding;
pub mod error;
pub mod ports;
pub mod session;
pub mod token;
pub mod wizard;

pub use area::ScopeArea;
pub use catalog::{AreaCatalog, CategoryDefinition, DimensionField};
pub use draft::{ScopeSheetSubmission, WizardDraft};
pub use error::WizardError;
pub use ports::ScopeSheetPort;
pub use session::{PhotoFile, PhotoUploadStatus, SubmissionState, WizardSession};
pub use token::{AccessToken, ContractorToken, TokenRejection, TokenValidation};
pub use wizard::{RebuildConfirmation, WizardPhase, WizardState};

#[cfg(any(test, feature = "mock"))]
pub use ports::mock::MockScopeSheetPort;
