//! Consensus solver
//!
//! Computes the confidence of every claim of one object by iterating a damped
//! fixed point between source weights and a weighted consensus value:
//!
//! 1. Seed each source's weight with `reputation ^ influence`
//! 2. Build the weighted consensus of the claimed values
//! 3. Score each claim: `raw = w * similarity(fact, consensus) / sum(w)`
//! 4. Blend weights towards the fresh scores with the dampening factor and
//!    repeat until scores move less than the tolerance or the iteration cap
//!    is reached
//! 5. Clip the last scores to [0, 1]

use crate::similarity::{CategoricalSimilarity, ContinuousSimilarity, Similarity, TextSimilarity};
use crate::reputation::NEUTRAL_REPUTATION;
use crate::{Datatype, DomainError, Object};
use std::collections::HashMap;

/// Default dampening factor
pub const DAMPENING: f64 = 0.1;

/// Default reputation influence exponent
pub const INFLUENCE: f64 = 0.8;

/// Default clustering threshold for string consensus
pub const SIMILARITY_THRESHOLD: f64 = 0.85;

/// Default convergence tolerance on the largest score change
pub const TOLERANCE: f64 = 1e-6;

/// Default iteration cap
pub const MAX_ITERATIONS: usize = 50;

/// Weights at or below this total count as zero
const MIN_TOTAL_WEIGHT: f64 = 1e-12;

/// Configuration for the consensus solver
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Share of the previous weight kept on each update, in [0, 1]
    pub dampening: f64,
    /// Exponent applied to reputations when seeding weights; `0` ignores them
    pub influence: f64,
    /// Minimum similarity for two strings to share weight in the consensus
    pub similarity_threshold: f64,
    /// Stop once no score moves by this much
    pub tolerance: f64,
    /// Hard cap on scoring rounds
    pub max_iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            dampening: DAMPENING,
            influence: INFLUENCE,
            similarity_threshold: SIMILARITY_THRESHOLD,
            tolerance: TOLERANCE,
            max_iterations: MAX_ITERATIONS,
        }
    }
}

/// Result of solving one object
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOutcome {
    /// Confidence per claim, parallel to the object's claims
    pub confidences: Vec<f64>,
    /// Scoring rounds performed
    pub iterations: usize,
    /// Whether the tolerance was met before the cap
    pub converged: bool,
    /// Rounds that fell back to uniform weights
    pub uniform_fallbacks: usize,
}

impl SolverOutcome {
    fn trivial(claims: usize) -> Self {
        Self {
            confidences: vec![1.0; claims],
            iterations: 0,
            converged: true,
            uniform_fallbacks: 0,
        }
    }
}

/// Iterative weighted-consensus solver
///
/// The solver only reads reputations; it never touches source state.
///
/// # Examples
///
/// ```
/// use skald_domain::{Claim, ConsensusSolver, Datatype, Object, SolverConfig};
/// use std::collections::HashMap;
///
/// let object = Object::new("x", Datatype::Categorical, vec![
///     Claim::new("s1", "A"),
///     Claim::new("s2", "A"),
///     Claim::new("s3", "B"),
/// ]);
/// let solver = ConsensusSolver::new(SolverConfig::default());
/// let outcome = solver.solve(&object, &HashMap::new()).unwrap();
///
/// assert_eq!(outcome.confidences[0], outcome.confidences[1]);
/// assert!(outcome.confidences[0] > outcome.confidences[2]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConsensusSolver {
    config: SolverConfig,
}

impl ConsensusSolver {
    /// Create a solver with the given configuration
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Get the solver configuration
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Compute the confidence of every claim of `object`
    ///
    /// `reputations` maps source ids to reputations in [0, 1]; sources missing
    /// from the map are treated as neutral.
    ///
    /// # Errors
    /// - [`DomainError::MalformedObject`] if the object has no claims
    /// - [`DomainError::IncomparableValue`] if a fact does not fit the datatype
    pub fn solve(
        &self,
        object: &Object,
        reputations: &HashMap<String, f64>,
    ) -> Result<SolverOutcome, DomainError> {
        if object.claims.is_empty() {
            return Err(DomainError::MalformedObject {
                object: object.name.clone(),
                reason: "object has no claims".to_string(),
            });
        }

        match object.datatype {
            Datatype::String => self.solve_with::<TextSimilarity>(object, reputations),
            Datatype::Continuous => self.solve_with::<ContinuousSimilarity>(object, reputations),
            Datatype::Categorical => self.solve_with::<CategoricalSimilarity>(object, reputations),
        }
    }

    fn solve_with<S: Similarity>(
        &self,
        object: &Object,
        reputations: &HashMap<String, f64>,
    ) -> Result<SolverOutcome, DomainError> {
        let values = object
            .claims
            .iter()
            .map(|claim| S::coerce(&claim.fact).map_err(|e| e.with_source(&claim.source_id)))
            .collect::<Result<Vec<_>, _>>()?;

        if values.len() == 1 {
            return Ok(SolverOutcome::trivial(1));
        }

        // Index claims by distinct source, in order of first appearance
        let mut sources: Vec<&str> = Vec::new();
        let mut claim_sources = Vec::with_capacity(values.len());
        for claim in &object.claims {
            let idx = match sources.iter().position(|s| *s == claim.source_id) {
                Some(idx) => idx,
                None => {
                    sources.push(&claim.source_id);
                    sources.len() - 1
                }
            };
            claim_sources.push(idx);
        }

        // Step 1: seed weights from reputation
        let mut weights: Vec<f64> = sources
            .iter()
            .map(|s| {
                let reputation = reputations.get(*s).copied().unwrap_or(NEUTRAL_REPUTATION);
                self.seed_weight(reputation)
            })
            .collect();

        let metric = S::calibrate(&values);
        let mut fallbacks = 0;

        // Steps 2 and 3
        let mut raw = self.score(&metric, &values, &claim_sources, &weights, &mut fallbacks);
        let mut iterations = 1;
        let mut converged = false;

        // Step 4: damped updates until the scores settle
        while iterations < self.config.max_iterations {
            let d = self.config.dampening;
            for (s, weight) in weights.iter_mut().enumerate() {
                let (sum, count) = raw
                    .iter()
                    .zip(&claim_sources)
                    .filter(|(_, &cs)| cs == s)
                    .fold((0.0, 0usize), |(sum, n), (r, _)| (sum + r, n + 1));
                let mean = if count > 0 { sum / count as f64 } else { 0.0 };
                *weight = d * *weight + (1.0 - d) * mean;
            }

            let next = self.score(&metric, &values, &claim_sources, &weights, &mut fallbacks);
            let delta = next
                .iter()
                .zip(&raw)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max);
            raw = next;
            iterations += 1;

            if delta < self.config.tolerance {
                converged = true;
                break;
            }
        }

        // Step 5
        let confidences = raw
            .into_iter()
            .map(|c| if c.is_finite() { c.clamp(0.0, 1.0) } else { 0.0 })
            .collect();

        Ok(SolverOutcome {
            confidences,
            iterations,
            converged,
            uniform_fallbacks: fallbacks,
        })
    }

    fn seed_weight(&self, reputation: f64) -> f64 {
        if self.config.influence == 0.0 {
            return 1.0;
        }
        let reputation = if reputation.is_finite() {
            reputation.clamp(0.0, 1.0)
        } else {
            NEUTRAL_REPUTATION
        };
        reputation.powf(self.config.influence)
    }

    /// One scoring round: consensus under the current weights, then the
    /// weight-normalized similarity of each claim to it
    fn score<S: Similarity>(
        &self,
        metric: &S,
        values: &[S::Value],
        claim_sources: &[usize],
        weights: &[f64],
        fallbacks: &mut usize,
    ) -> Vec<f64> {
        let mut claim_weights: Vec<f64> = claim_sources.iter().map(|&s| weights[s]).collect();
        let mut total: f64 = claim_weights.iter().sum();

        if !(total > MIN_TOTAL_WEIGHT) || !total.is_finite() {
            claim_weights.iter_mut().for_each(|w| *w = 1.0);
            total = claim_weights.len() as f64;
            *fallbacks += 1;
        }

        let consensus = metric.consensus(values, &claim_weights, self.config.similarity_threshold);
        values
            .iter()
            .zip(&claim_weights)
            .map(|(v, w)| w * metric.similarity(v, &consensus) / total)
            .collect()
    }
}
