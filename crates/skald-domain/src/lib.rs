//! Skald Domain Layer
//!
//! This crate contains the consolidation core of Skald: the value types a
//! consolidation request is made of, the datatype-aware similarity functions,
//! the Bayesian reputation bookkeeping and the iterative consensus solver.
//! It performs no I/O; persistence is reached through the [`traits::SourceStore`]
//! trait, implemented in `skald-store`.
//!
//! ## Key Concepts
//!
//! - **Claim**: one source's assertion of a value (a [`Fact`]) for a named object
//! - **Object**: the thing being resolved, with a [`Datatype`] and competing claims
//! - **Histogram**: per-source counts of rating tiers, the only persisted state
//! - **Reputation**: smoothed point estimate derived from a histogram
//! - **Confidence**: consensus score in [0, 1] computed per claim by the solver
//!
//! ## Architecture
//!
//! - Pure computation only, no logging and no storage
//! - Datatype polymorphism goes through the [`similarity::Similarity`] trait
//! - Infrastructure implementations live in other crates

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod claim;
pub mod consensus;
pub mod datatype;
pub mod error;
pub mod reputation;
pub mod similarity;
pub mod source;
pub mod tier;
pub mod traits;

// Re-exports for convenience
pub use claim::{Claim, Fact, Object, ScoredClaim};
pub use consensus::{ConsensusSolver, SolverConfig, SolverOutcome};
pub use datatype::Datatype;
pub use error::DomainError;
pub use reputation::{ReputationParams, SourceStatistics};
pub use source::{Histogram, SourceRecord};
pub use tier::RatingTier;
