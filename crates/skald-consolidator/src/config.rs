//! Configuration for the consolidation engine
//!
//! One process-wide set of parameters, fixed at startup. Every field has a
//! default so partial TOML tables are accepted.

use crate::ConsolidationError;
use serde::{Deserialize, Serialize};
use skald_domain::consensus::{DAMPENING, INFLUENCE, MAX_ITERATIONS, SIMILARITY_THRESHOLD, TOLERANCE};
use skald_domain::{ReputationParams, SolverConfig};

/// Engine configuration
///
/// # Examples
///
/// ```
/// use skald_consolidator::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert_eq!(config.k, 10);
/// assert!(!config.stateful);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of rating tiers, the histogram width (`K`)
    pub k: usize,

    /// Laplace smoothing factor (`LF`), >= 0
    #[serde(alias = "lf")]
    pub laplace_factor: f64,

    /// Consensus dampening, in [0, 1]
    pub dampening: f64,

    /// Reputation influence exponent, >= 0
    pub influence: f64,

    /// Persist histograms across requests
    pub stateful: bool,

    /// Clustering threshold for string consensus, in [0, 1]
    pub similarity_threshold: f64,

    /// Convergence tolerance of the solver
    pub tolerance: f64,

    /// Iteration cap of the solver
    pub max_iterations: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            k: 10,
            laplace_factor: 1.0,
            dampening: DAMPENING,
            influence: INFLUENCE,
            stateful: false,
            similarity_threshold: SIMILARITY_THRESHOLD,
            tolerance: TOLERANCE,
            max_iterations: MAX_ITERATIONS,
        }
    }
}

impl EngineConfig {
    /// Check every parameter against its allowed range
    pub fn validate(&self) -> Result<(), ConsolidationError> {
        let invalid = |msg: String| Err(ConsolidationError::InvalidConfig(msg));

        if self.k == 0 {
            return invalid("K must be a positive integer".to_string());
        }
        if !self.laplace_factor.is_finite() || self.laplace_factor < 0.0 {
            return invalid(format!("LF must be a finite number >= 0, got {}", self.laplace_factor));
        }
        if !(0.0..=1.0).contains(&self.dampening) {
            return invalid(format!("DAMPENING must be in [0, 1], got {}", self.dampening));
        }
        if !self.influence.is_finite() || self.influence < 0.0 {
            return invalid(format!("INFLUENCE must be a finite number >= 0, got {}", self.influence));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return invalid(format!(
                "similarity_threshold must be in [0, 1], got {}",
                self.similarity_threshold
            ));
        }
        if !(self.tolerance > 0.0) {
            return invalid(format!("tolerance must be positive, got {}", self.tolerance));
        }
        if self.max_iterations == 0 {
            return invalid("max_iterations must be positive".to_string());
        }
        Ok(())
    }

    /// Parameters of the consensus solver
    pub fn solver_config(&self) -> SolverConfig {
        SolverConfig {
            dampening: self.dampening,
            influence: self.influence,
            similarity_threshold: self.similarity_threshold,
            tolerance: self.tolerance,
            max_iterations: self.max_iterations,
        }
    }

    /// Parameters of the reputation math
    pub fn reputation_params(&self) -> ReputationParams {
        ReputationParams::new(self.k, self.laplace_factor)
    }
}
