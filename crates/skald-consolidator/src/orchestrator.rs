//! Consolidation Orchestrator
//!
//! Drives one request end to end:
//!
//! 1. Validate every object and seed before touching the ledger
//! 2. Open a ledger session over all sources of the request and apply seeds
//! 3. For each object in order: read reputations, solve, rank, quantize each
//!    confidence into a rating tier and record it
//! 4. Report the statistics of every source seen, then commit the session
//!
//! A ledger failure aborts the request with nothing committed. An object whose
//! facts cannot be interpreted is reported with an error and records no
//! ratings; its siblings are unaffected.

use crate::api::{
    ClaimResult, ConsolidationRequest, ConsolidationResponse, ObjectFailure, ObjectResult,
    SourceReport,
};
use crate::composite::Plan;
use crate::error::domain_kind;
use crate::ledger::{LedgerSession, SourceLedger};
use crate::{ConsolidationError, ConsolidationMetrics, EngineConfig};
use parking_lot::Mutex;
use skald_domain::traits::SourceStore;
use skald_domain::{ConsensusSolver, DomainError, Fact, Histogram, Object, RatingTier, ScoredClaim};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Display;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

/// Consolidation engine over a [`SourceStore`]
///
/// Safe to share between threads; requests touching disjoint sources run in
/// parallel.
///
/// # Examples
///
/// ```
/// use skald_consolidator::{ConsolidationRequest, Consolidator, EngineConfig};
/// use skald_store::MemoryStore;
///
/// let engine = Consolidator::new(EngineConfig::default(), MemoryStore::new()).unwrap();
/// let request: ConsolidationRequest = serde_json::from_str(r#"{
///     "objects": [{"name": "x", "datatype": "categorical", "claims": [
///         {"sourceId": "s1", "fact": "A"},
///         {"sourceId": "s2", "fact": "A"},
///         {"sourceId": "s3", "fact": "B"}
///     ]}]
/// }"#).unwrap();
///
/// let response = engine.consolidate(request).unwrap();
/// let claims = &response.objects[0].claims;
/// assert_eq!(claims[2].source_id.as_deref(), Some("s3"));
/// ```
pub struct Consolidator<S> {
    config: EngineConfig,
    solver: ConsensusSolver,
    ledger: SourceLedger<S>,
    metrics: Mutex<ConsolidationMetrics>,
}

/// Outcome of one object before its ratings are recorded
struct Resolved {
    result: ObjectResult,
    ratings: Vec<(String, f64)>,
}

impl<S> Consolidator<S>
where
    S: SourceStore,
    S::Error: Display,
{
    /// Create an engine, validating the configuration
    pub fn new(config: EngineConfig, store: S) -> Result<Self, ConsolidationError> {
        config.validate()?;
        let ledger = SourceLedger::new(store, config.reputation_params(), config.stateful);
        Ok(Self {
            solver: ConsensusSolver::new(config.solver_config()),
            ledger,
            config,
            metrics: Mutex::new(ConsolidationMetrics::new()),
        })
    }

    /// Get the engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get the source ledger
    pub fn ledger(&self) -> &SourceLedger<S> {
        &self.ledger
    }

    /// Snapshot of the runtime counters
    pub fn metrics(&self) -> ConsolidationMetrics {
        self.metrics.lock().clone()
    }

    /// Consolidate a request
    ///
    /// # Errors
    /// - [`ConsolidationError::MalformedObject`] / [`ConsolidationError::MalformedSource`]
    ///   if the request fails validation; nothing is processed
    /// - [`ConsolidationError::LedgerUnavailable`] if the store fails; nothing
    ///   is committed
    pub fn consolidate(
        &self,
        request: ConsolidationRequest,
    ) -> Result<ConsolidationResponse, ConsolidationError> {
        let request_id = Uuid::now_v7();
        let span = info_span!("consolidate", %request_id);
        let _enter = span.enter();

        self.metrics.lock().record_request();
        info!(
            objects = request.objects.len(),
            seeds = request.sources.as_ref().map_or(0, Vec::len),
            "Consolidation started"
        );

        let plans = request
            .objects
            .iter()
            .map(Plan::build)
            .collect::<Result<Vec<_>, _>>()
            .inspect_err(|e| warn!(error = %e, "Request rejected"))?;
        let seeds = self
            .validate_seeds(request.sources.unwrap_or_default())
            .inspect_err(|e| warn!(error = %e, "Request rejected"))?;

        let source_ids = Self::sources_seen(&plans, &seeds);
        let mut session = self.ledger.begin(&source_ids)?;
        for (source_id, histogram) in seeds {
            session.seed(&source_id, histogram)?;
        }

        let mut objects = Vec::with_capacity(plans.len());
        let (mut failed, mut ratings) = (0, 0);
        for plan in &plans {
            match self.resolve(&session, plan) {
                Ok(resolved) => {
                    for (source_id, confidence) in &resolved.ratings {
                        let tier = RatingTier::quantize(*confidence, self.config.k);
                        session.record_rating(source_id, tier)?;
                    }
                    ratings += resolved.ratings.len();
                    objects.push(resolved.result);
                }
                Err(e @ DomainError::IncomparableValue { .. }) => {
                    warn!(object = plan.name(), error = %e, "Object skipped");
                    failed += 1;
                    objects.push(ObjectResult {
                        name: plan.name().to_string(),
                        claims: Vec::new(),
                        error: Some(ObjectFailure {
                            kind: domain_kind(&e).to_string(),
                            message: e.to_string(),
                        }),
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }

        let sources = source_ids
            .iter()
            .map(|id| Self::report(&session, id))
            .collect();
        let written = session.commit()?;

        self.metrics
            .lock()
            .record_outcome(objects.len() - failed, failed, ratings);
        info!(
            objects = objects.len(),
            failed,
            ratings,
            written,
            "Consolidation finished"
        );

        Ok(ConsolidationResponse {
            timestamp: chrono::Utc::now().to_rfc3339(),
            objects,
            sources,
        })
    }

    /// Delete every source record
    pub fn clear(&self) -> Result<usize, ConsolidationError> {
        let removed = self.ledger.clear_all()?;
        self.metrics.lock().record_clear();
        info!(removed, "Source ledger cleared");
        Ok(removed)
    }

    /// Report every stored source, sorted by identifier
    ///
    /// Waits for sessions touching those sources to finish. Empty in stateless
    /// mode.
    pub fn sources(&self) -> Result<Vec<SourceReport>, ConsolidationError> {
        let source_ids = self.ledger.source_ids()?;
        let session = self.ledger.begin(&source_ids)?;
        debug!(sources = source_ids.len(), "Sources listed");
        Ok(source_ids
            .iter()
            .map(|id| Self::report(&session, id))
            .collect())
    }

    fn validate_seeds(
        &self,
        seeds: Vec<crate::api::SourceSeed>,
    ) -> Result<Vec<(String, Histogram)>, ConsolidationError> {
        seeds
            .into_iter()
            .map(|seed| {
                if seed.source_id.trim().is_empty() {
                    return Err(ConsolidationError::MalformedSource {
                        source_id: seed.source_id,
                        reason: "empty sourceId".to_string(),
                    });
                }
                if seed.ratings.len() != self.config.k {
                    return Err(ConsolidationError::MalformedSource {
                        reason: format!(
                            "expected {} ratings, got {}",
                            self.config.k,
                            seed.ratings.len()
                        ),
                        source_id: seed.source_id,
                    });
                }
                let histogram = Histogram::from_counts(seed.ratings);
                if histogram.checked_total().is_none() {
                    return Err(ConsolidationError::MalformedSource {
                        source_id: seed.source_id,
                        reason: "ratings total overflows".to_string(),
                    });
                }
                Ok((seed.source_id, histogram))
            })
            .collect()
    }

    /// Distinct sources of the request: claim sources first, then seed-only ones
    fn sources_seen(plans: &[Plan], seeds: &[(String, Histogram)]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        let claimed = plans.iter().flat_map(Plan::source_ids);
        let seeded = seeds.iter().map(|(id, _)| id.as_str());
        for id in claimed.chain(seeded) {
            if seen.insert(id) {
                ordered.push(id.to_string());
            }
        }
        ordered
    }

    fn resolve(&self, session: &LedgerSession<'_, S>, plan: &Plan) -> Result<Resolved, DomainError> {
        match plan {
            Plan::Single(object) => {
                let ranked = self.rank(session, object)?;
                let ratings = ranked
                    .iter()
                    .map(|c| (c.source_id.clone(), c.confidence))
                    .collect();
                let claims = ranked
                    .into_iter()
                    .map(|c| ClaimResult {
                        fact: c.fact,
                        confidence: c.confidence,
                        source_id: Some(c.source_id),
                    })
                    .collect();
                Ok(Resolved {
                    result: ObjectResult {
                        name: object.name.clone(),
                        claims,
                        error: None,
                    },
                    ratings,
                })
            }
            Plan::Record { name, fields } => {
                let mut merged = BTreeMap::new();
                let mut ratings = Vec::new();
                let mut total = 0.0;
                for (field, object) in fields {
                    let ranked = self.rank(session, object)?;
                    ratings.extend(ranked.iter().map(|c| (c.source_id.clone(), c.confidence)));
                    if let Some(best) = ranked.into_iter().next() {
                        total += best.confidence;
                        merged.insert(field.clone(), Some(best.fact));
                    }
                }
                let confidence = total / fields.len() as f64;
                Ok(Resolved {
                    result: ObjectResult {
                        name: name.clone(),
                        claims: vec![ClaimResult {
                            fact: Fact::Record(merged),
                            confidence,
                            source_id: None,
                        }],
                        error: None,
                    },
                    ratings,
                })
            }
        }
    }

    /// Solve one base object and sort its claims by descending confidence
    fn rank(&self, session: &LedgerSession<'_, S>, object: &Object) -> Result<Vec<ScoredClaim>, DomainError> {
        let reputations: HashMap<String, f64> = object
            .claims
            .iter()
            .map(|c| (c.source_id.clone(), session.reputation_of(&c.source_id)))
            .collect();

        let outcome = self.solver.solve(object, &reputations)?;
        self.metrics
            .lock()
            .record_solve(outcome.iterations, outcome.converged);
        if !outcome.converged {
            warn!(
                object = %object.name,
                iterations = outcome.iterations,
                "Solver hit the iteration cap; using last iterate"
            );
        }
        if outcome.uniform_fallbacks > 0 {
            warn!(
                object = %object.name,
                rounds = outcome.uniform_fallbacks,
                "Zero total weight; fell back to uniform weights"
            );
        }
        debug!(
            object = %object.name,
            claims = object.claims.len(),
            iterations = outcome.iterations,
            converged = outcome.converged,
            "Object solved"
        );

        let mut ranked: Vec<ScoredClaim> = object
            .claims
            .iter()
            .zip(outcome.confidences)
            .map(|(claim, confidence)| ScoredClaim {
                source_id: claim.source_id.clone(),
                fact: claim.fact.clone(),
                confidence,
            })
            .collect();
        // Stable: ties keep input order
        ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        Ok(ranked)
    }

    fn report(session: &LedgerSession<'_, S>, source_id: &str) -> SourceReport {
        let stats = session.statistics(source_id);
        SourceReport {
            source_id: source_id.to_string(),
            reputation: stats.reputation,
            probabilities: stats.probabilities,
            ratings: session.histogram(source_id).counts().to_vec(),
        }
    }
}
