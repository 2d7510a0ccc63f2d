//! Claim Guide - Command Line Client
//!
//! Drives the claim filing flow and the contractor wizard against a live
//! collaborator.
//!
//! # Usage
//!
//! ```bash
//! claim-guide claim status 0190a000-0000-7000-8000-000000000001
//! claim-guide claim watch-parse 0190a000-0000-7000-8000-000000000001
//! claim-guide claim audit 0190a000-0000-7000-8000-000000000001
//! claim-guide wizard show a1b2c3d4
//! claim-guide health
//! ```
//!
//! # Environment Variables
//!
//! * `CLAIM_GUIDE_BASE_URL` - Collaborator root URL (default: http://localhost:8080)
//! * `CLAIM_GUIDE_API_TOKEN` - Claim owner's bearer token
//! * `CLAIM_GUIDE_TIMEOUT_SECS` - Request timeout in seconds (default: 30)
//! * `CLAIM_GUIDE_POLL_INTERVAL_SECS` - Parse-status poll interval (default: 3)
//! * `CLAIM_GUIDE_LOG_LEVEL` - Log level: trace, debug, info, warn, error (default: info)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use core_kernel::HealthCheckable;
use infra_http::{HttpClaimFilingAdapter, HttpScopeSheetAdapter};
use interface_cli::commands;
use interface_cli::ClientConfig;

#[derive(Parser)]
#[command(name = "claim-guide")]
#[command(about = "Guided insurance claim filing and contractor scope sheets")]
#[command(version)]
struct Cli {
    /// Overrides CLAIM_GUIDE_BASE_URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Claim owner commands
    Claim {
        #[command(subcommand)]
        action: ClaimAction,
    },

    /// Contractor wizard commands
    Wizard {
        #[command(subcommand)]
        action: WizardAction,
    },

    /// Check that the collaborator is reachable
    Health,
}

#[derive(Subcommand)]
enum ClaimAction {
    /// Show the seven filing steps and where the claim stands
    Status { claim_id: String },

    /// Wait for the newest carrier estimate to finish parsing
    WatchParse { claim_id: String },

    /// Run the estimate audit
    Audit { claim_id: String },
}

#[derive(Subcommand)]
enum WizardAction {
    /// Show the saved wizard for an access token
    Show { token: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env().context("Failed to read CLAIM_GUIDE_* settings")?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }

    init_tracing(&config.log_level);
    tracing::debug!(base_url = %config.base_url, "Configuration loaded");

    match cli.command {
        Commands::Claim { action } => run_claim(&config, action).await,
        Commands::Wizard { action } => run_wizard(&config, action).await,
        Commands::Health => run_health(&config).await,
    }
}

async fn run_claim(config: &ClientConfig, action: ClaimAction) -> Result<()> {
    let port = Arc::new(HttpClaimFilingAdapter::new(config.adapter_config())?);

    match action {
        ClaimAction::Status { claim_id } => {
            let claim_id = commands::parse_claim_id(&claim_id)?;
            let report = commands::claim_status(port, claim_id).await?;
            println!("{}", report);
        }
        ClaimAction::WatchParse { claim_id } => {
            let claim_id = commands::parse_claim_id(&claim_id)?;
            let state = commands::watch_parse(port, claim_id, config.poll_interval()).await?;
            println!("Carrier estimate: {}", commands::describe_pipeline(&state));
        }
        ClaimAction::Audit { claim_id } => {
            let claim_id = commands::parse_claim_id(&claim_id)?;
            let view = commands::run_audit(port, claim_id).await?;
            println!("{}", commands::describe_audit(&view));
        }
    }
    Ok(())
}

async fn run_wizard(config: &ClientConfig, action: WizardAction) -> Result<()> {
    // The wizard authenticates through the token in the path
    let mut adapter_config = config.adapter_config();
    adapter_config.api_token = None;
    let port = Arc::new(HttpScopeSheetAdapter::new(adapter_config)?);

    match action {
        WizardAction::Show { token } => {
            let summary = commands::wizard_show(port, &token).await?;
            println!("{}", summary);
        }
    }
    Ok(())
}

async fn run_health(config: &ClientConfig) -> Result<()> {
    let claims = HttpClaimFilingAdapter::new(config.adapter_config())?;
    let scope = HttpScopeSheetAdapter::new(config.adapter_config())?;

    let adapters: [&dyn HealthCheckable; 2] = [&claims, &scope];
    let results = commands::health(&adapters).await;
    for result in &results {
        println!(
            "{}: {:?} ({} ms){}",
            result.adapter_id,
            result.status,
            result.latency_ms,
            result.message.as_deref().map(|m| format!(" - {}", m)).unwrap_or_default()
        );
    }
    if !commands::all_healthy(&results) {
        anyhow::bail!("collaborator is not healthy");
    }
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// `RUST_LOG` wins over the configured level.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}
