//! Metrics collection for consolidation operations

use serde::{Deserialize, Serialize};

/// Counters collected while serving requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationMetrics {
    /// Consolidate requests received
    pub requests: u64,

    /// Objects resolved successfully
    pub objects_consolidated: u64,

    /// Objects reported with a per-object error
    pub objects_failed: u64,

    /// Ratings recorded into histograms
    pub ratings_recorded: u64,

    /// Scoring rounds run by the solver
    pub solver_iterations: u64,

    /// Solves stopped by the iteration cap
    pub non_converged: u64,

    /// Clear operations performed
    pub clears: u64,
}

impl ConsolidationMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an incoming request
    pub fn record_request(&mut self) {
        self.requests += 1;
    }

    /// Record a solved object
    pub fn record_solve(&mut self, iterations: usize, converged: bool) {
        self.solver_iterations += iterations as u64;
        if !converged {
            self.non_converged += 1;
        }
    }

    /// Record the outcome of a committed request
    pub fn record_outcome(&mut self, consolidated: usize, failed: usize, ratings: usize) {
        self.objects_consolidated += consolidated as u64;
        self.objects_failed += failed as u64;
        self.ratings_recorded += ratings as u64;
    }

    /// Record a clear
    pub fn record_clear(&mut self) {
        self.clears += 1;
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        [
            "Consolidation Metrics Summary".to_string(),
            "=============================".to_string(),
            format!("Requests: {}", self.requests),
            format!("Objects consolidated: {}", self.objects_consolidated),
            format!("Objects failed: {}", self.objects_failed),
            format!("Ratings recorded: {}", self.ratings_recorded),
            format!("Solver iterations: {}", self.solver_iterations),
            format!("Non-converged solves: {}", self.non_converged),
            format!("Clears: {}", self.clears),
        ]
        .join("\n")
    }
}
