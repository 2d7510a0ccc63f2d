//! Core Kernel - Foundational types shared by the claim guide domains
//!
//! This crate provides the building blocks used by both the claim owner's
//! filing flow and the contractor's scope-sheet wizard:
//! - Strongly-typed identifiers
//! - The port error type and adapter health checks
//! - The three-call upload choreography shared by photo and document uploads

pub mod identifiers;
pub mod ports;
pub mod upload;

pub use identifiers::{
    ClaimId, DocumentId, AuditReportId, PaymentId, ScopeAreaId, PhotoId,
};
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
};
pub use upload::{UploadPort, UploadRequest, UploadTicket, run_upload};
