//! Skald server CLI
//!
//! Starts the HTTP server for claim consolidation.

use clap::Parser;
use skald_server::{config::ServerConfig, start_server, ServerError};
use std::path::PathBuf;
use std::process;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Skald - reputation-weighted claim consolidation
#[derive(Debug, Parser)]
#[command(name = "skald-server", version, about)]
struct Cli {
    /// Load configuration from a TOML file
    #[arg(long, env = "SKALD_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), ServerError> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)?,
        None => {
            warn!("No config file specified, using defaults (127.0.0.1:8000, in-memory ledger)");
            ServerConfig::default()
        }
    };
    let config = config.with_env_overrides()?;

    start_server(config).await
}
