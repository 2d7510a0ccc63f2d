//! Test Utilities Crate
//!
//! Shared test infrastructure for the claim guide test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built claims, files, audit outcomes, and wizard sessions
//! - `builders`: Builder patterns for claims, areas, drafts, and comparisons
//! - `assertions`: Assertion helpers for progress and area contents
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use assertions::*;
pub use generators::*;
