//! HTTP request handlers for the consolidation service.
//!
//! Implements the consolidate, clear, sources, health and metrics endpoints
//! using axum.
//! Consolidation is CPU-bound and may block on the ledger store, so it runs
//! on the blocking thread pool.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use skald_consolidator::{
    ClearResponse, ConsolidationError, ConsolidationMetrics, ConsolidationRequest,
    ConsolidationResponse, Consolidator, SourcesResponse,
};
use skald_domain::traits::SourceStore;
use std::fmt::Display;
use std::sync::Arc;
use tracing::error;

/// Shared application state
pub struct AppState<S> {
    /// Consolidation engine
    pub consolidator: Arc<Consolidator<S>>,
}

impl<S> AppState<S> {
    /// Wrap an engine
    pub fn new(consolidator: Consolidator<S>) -> Self {
        Self {
            consolidator: Arc::new(consolidator),
        }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            consolidator: Arc::clone(&self.consolidator),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Overall health status
    pub status: String,
    /// Whether histograms persist across requests
    pub stateful: bool,
    /// Number of rating tiers
    pub k: usize,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error name, e.g. `MalformedObject`
    pub kind: String,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Error raised while consolidating or clearing
    Consolidation(ConsolidationError),
    /// Body that is not a valid request
    BadRequest(String),
    /// Internal server error
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            AppError::Consolidation(e) => {
                let status = match &e {
                    ConsolidationError::LedgerUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                    e if e.is_client_error() => StatusCode::BAD_REQUEST,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.kind(), e.to_string())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BadRequest", msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal", msg),
        };

        let body = Json(ErrorResponse {
            error: message,
            kind: kind.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<ConsolidationError> for AppError {
    fn from(e: ConsolidationError) -> Self {
        AppError::Consolidation(e)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Run an engine call on the blocking pool
async fn run_blocking<T, F>(f: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ConsolidationError> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => Ok(result?),
        Err(e) => {
            error!(error = %e, "Blocking task failed");
            Err(AppError::Internal(format!("task failed: {}", e)))
        }
    }
}

/// POST /consolidate - Rank claims and update source reputations
async fn consolidate<S>(
    State(state): State<AppState<S>>,
    payload: Result<Json<ConsolidationRequest>, JsonRejection>,
) -> Result<Json<ConsolidationResponse>, AppError>
where
    S: SourceStore + Send + 'static,
    S::Error: Display,
{
    let Json(request) = payload?;
    let consolidator = Arc::clone(&state.consolidator);
    let response = run_blocking(move || consolidator.consolidate(request)).await?;
    Ok(Json(response))
}

/// GET /clear - Delete every source record
async fn clear<S>(State(state): State<AppState<S>>) -> Result<Json<ClearResponse>, AppError>
where
    S: SourceStore + Send + 'static,
    S::Error: Display,
{
    let consolidator = Arc::clone(&state.consolidator);
    let removed = run_blocking(move || consolidator.clear()).await?;
    Ok(Json(ClearResponse::cleared(removed)))
}

/// GET /sources - Reputation of every stored source
async fn sources<S>(State(state): State<AppState<S>>) -> Result<Json<SourcesResponse>, AppError>
where
    S: SourceStore + Send + 'static,
    S::Error: Display,
{
    let consolidator = Arc::clone(&state.consolidator);
    let sources = run_blocking(move || consolidator.sources()).await?;
    Ok(Json(SourcesResponse { sources }))
}

/// GET /health - Liveness and engine parameters
async fn health_check<S>(State(state): State<AppState<S>>) -> Json<HealthCheckResponse>
where
    S: SourceStore + Send + 'static,
    S::Error: Display,
{
    let config = state.consolidator.config();
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        stateful: config.stateful,
        k: config.k,
    })
}

/// GET /metrics - Runtime counters
async fn metrics<S>(State(state): State<AppState<S>>) -> Json<ConsolidationMetrics>
where
    S: SourceStore + Send + 'static,
    S::Error: Display,
{
    Json(state.consolidator.metrics())
}

/// Create the axum router with all routes
pub fn create_router<S>(state: AppState<S>) -> Router
where
    S: SourceStore + Send + 'static,
    S::Error: Display,
{
    Router::new()
        .route("/consolidate", post(consolidate::<S>))
        .route("/clear", get(clear::<S>))
        .route("/sources", get(sources::<S>).delete(clear::<S>))
        .route("/health", get(health_check::<S>))
        .route("/metrics", get(metrics::<S>))
        .with_state(state)
}
