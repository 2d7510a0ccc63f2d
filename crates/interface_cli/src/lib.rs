//! Claim Guide CLI
//!
//! Library half of the `claim-guide` binary: configuration, the CLI error
//! type, and the command implementations. The binary wires them to the HTTP
//! adapters; tests drive the same commands against the in-memory ports.

pub mod commands;
pub mod config;
pub mod error;

pub use config::ClientConfig;
pub use error::CliError;
