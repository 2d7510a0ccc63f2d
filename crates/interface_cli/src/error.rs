//! CLI error handling

use thiserror::Error;

use domain_claims::FilingError;
use domain_scope::WizardError;

/// CLI error types
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Adapter setup failed: {0}")]
    Adapter(#[from] infra_http::ConfigError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Filing(#[from] FilingError),

    #[error(transparent)]
    Wizard(#[from] WizardError),
}

impl CliError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        CliError::InvalidArgument(message.into())
    }
}
