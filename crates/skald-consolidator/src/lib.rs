//! Skald Consolidator
//!
//! Application layer of Skald: turns consolidate requests into ranked claims
//! and keeps every source's rating history up to date.
//!
//! # Overview
//!
//! - **Source Ledger** ([`SourceLedger`]): owns histogram mutation, with
//!   request-scoped sessions committed all-or-nothing
//! - **Orchestrator** ([`Consolidator`]): validates the request, solves each
//!   object with [`skald_domain::ConsensusSolver`], ranks claims, quantizes
//!   confidences into rating tiers and records them
//! - **Composite datatypes**: `list-string`, `list-categorical` and `address`
//!   objects are expanded into base objects before solving
//! - **Metrics**: counters for monitoring
//!
//! # Usage
//!
//! ```no_run
//! use skald_consolidator::{ConsolidationRequest, Consolidator, EngineConfig};
//! use skald_store::SqliteStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig { stateful: true, ..Default::default() };
//! let engine = Consolidator::new(config, SqliteStore::new("skald.db")?)?;
//!
//! let request: ConsolidationRequest = serde_json::from_str(
//!     r#"{"objects": [{"name": "height", "datatype": "continuous",
//!         "claims": [{"sourceId": "a", "fact": 1.80}, {"sourceId": "b", "fact": 1.82}]}]}"#,
//! )?;
//! let response = engine.consolidate(request)?;
//! println!("{}", engine.metrics().summary());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! ```toml
//! [engine]
//! k = 10
//! laplace_factor = 1.0
//! dampening = 0.1
//! influence = 0.8
//! stateful = false
//! ```

#![warn(missing_docs)]

mod api;
mod composite;
mod config;
mod error;
mod ledger;
mod metrics;
mod orchestrator;

pub use api::{
    ClaimPayload, ClaimResult, ClearResponse, ConsolidationRequest, ConsolidationResponse,
    ObjectFailure, ObjectPayload, ObjectResult, SourceReport, SourceSeed, SourcesResponse,
};
pub use composite::{ObjectKind, Plan};
pub use config::EngineConfig;
pub use error::{domain_kind, ConsolidationError};
pub use ledger::{LedgerSession, SourceLedger};
pub use metrics::ConsolidationMetrics;
pub use orchestrator::Consolidator;
