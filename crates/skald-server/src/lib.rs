//! Skald Server
//!
//! HTTP boundary of the consolidation engine.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | POST | `/consolidate` | rank claims, update reputations |
//! | GET | `/clear` | delete every source record |
//! | DELETE | `/sources` | same as `/clear` |
//! | GET | `/health` | liveness and engine parameters |
//! | GET | `/metrics` | runtime counters |

#![warn(missing_docs)]

pub mod config;
pub mod handlers;

use config::ServerConfig;
use handlers::{create_router, AppState};
use skald_consolidator::{ConsolidationError, Consolidator};
use skald_store::{SqliteStore, StoreError};
use tokio::net::TcpListener;
use tracing::info;

/// Server error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Ledger store could not be opened
    #[error("Failed to open ledger store: {0}")]
    Store(#[from] StoreError),

    /// Engine could not be created
    #[error("Failed to create engine: {0}")]
    Engine(#[from] ConsolidationError),

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Build the engine described by `config` over a SQLite ledger
pub fn build_state(config: &ServerConfig) -> Result<AppState<SqliteStore>, ServerError> {
    config.validate()?;
    let store = SqliteStore::new(&config.database_path)?;
    let consolidator = Consolidator::new(config.engine.clone(), store)?;
    Ok(AppState::new(consolidator))
}

/// Start the HTTP server
///
/// Opens the ledger store, creates the engine and serves until the process
/// is stopped.
pub async fn start_server(config: ServerConfig) -> Result<(), ServerError> {
    info!("Starting Skald server");
    info!("Bind address: {}", config.bind_addr());
    info!("Ledger database: {}", config.database_path);
    info!(
        k = config.engine.k,
        lf = config.engine.laplace_factor,
        dampening = config.engine.dampening,
        influence = config.engine.influence,
        stateful = config.engine.stateful,
        "Engine parameters"
    );

    let state = build_state(&config)?;
    let app = create_router(state);

    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("Server listening on {}", config.bind_addr());

    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::Server(e.to_string()))?;

    Ok(())
}
