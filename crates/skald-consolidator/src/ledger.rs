//! Source Ledger
//!
//! Owns every mutation of source histograms. A request works on a
//! [`LedgerSession`]: the histograms of its sources are loaded once, ratings
//! are recorded into that working copy (so later objects of the same request
//! see them), and the whole batch is written back in a single
//! [`SourceStore::save_all`] call on commit. Dropping a session without
//! committing discards its ratings.
//!
//! Concurrent requests that share a source are serialized: a session leases
//! all of its sources at once before loading them and releases them when it
//! ends, so increments are never lost between load and save. Clearing the
//! ledger waits for every lease to be released and holds off new sessions
//! until the store is empty, so a session can never write back a history
//! loaded before the clear.

use crate::ConsolidationError;
use parking_lot::{Condvar, Mutex, MutexGuard};
use skald_domain::traits::SourceStore;
use skald_domain::{Histogram, RatingTier, ReputationParams, SourceRecord, SourceStatistics};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::Display;
use tracing::{debug, error};

/// Source Ledger backed by a [`SourceStore`]
///
/// In stateless mode the store is never read or written by sessions: every
/// request starts from empty histograms (plus its seeds) and its ratings are
/// dropped with the session.
pub struct SourceLedger<S> {
    store: Mutex<S>,
    leases: Mutex<Leases>,
    released: Condvar,
    params: ReputationParams,
    stateful: bool,
}

#[derive(Default)]
struct Leases {
    held: HashSet<String>,
    clearing: bool,
}

impl<S> SourceLedger<S>
where
    S: SourceStore,
    S::Error: Display,
{
    /// Create a ledger over `store`
    pub fn new(store: S, params: ReputationParams, stateful: bool) -> Self {
        Self {
            store: Mutex::new(store),
            leases: Mutex::new(Leases::default()),
            released: Condvar::new(),
            params,
            stateful,
        }
    }

    /// Reputation parameters shared by every source
    pub fn params(&self) -> &ReputationParams {
        &self.params
    }

    /// Whether histograms outlive requests
    pub fn is_stateful(&self) -> bool {
        self.stateful
    }

    /// Direct access to the backing store
    pub fn store(&self) -> MutexGuard<'_, S> {
        self.store.lock()
    }

    /// Open a session over the given sources
    ///
    /// Blocks until no other session holds any of them. In stateful mode
    /// their histograms are loaded from the store.
    ///
    /// # Errors
    /// - [`ConsolidationError::LedgerUnavailable`] if the store cannot be read
    /// - [`ConsolidationError::IncompatibleHistogram`] if a stored histogram
    ///   does not have `K` tiers
    pub fn begin(&self, source_ids: &[String]) -> Result<LedgerSession<'_, S>, ConsolidationError> {
        let ids: BTreeSet<String> = source_ids.iter().cloned().collect();

        let lease = if self.stateful {
            self.acquire(&ids);
            ids.iter().cloned().collect()
        } else {
            Vec::new()
        };

        let mut session = LedgerSession {
            ledger: self,
            working: HashMap::new(),
            dirty: BTreeSet::new(),
            lease,
        };

        if self.stateful {
            let wanted: Vec<String> = ids.into_iter().collect();
            let loaded = self
                .store
                .lock()
                .load_many(&wanted)
                .map_err(|e| self.unavailable("load", e))?;

            for (source_id, histogram) in loaded {
                self.check_width(&source_id, &histogram)?;
                session.working.insert(source_id, histogram);
            }
        }

        Ok(session)
    }

    /// Statistics of one source as currently stored
    ///
    /// Sources without history, and every source in stateless mode, get the
    /// neutral statistics.
    pub fn statistics(&self, source_id: &str) -> Result<SourceStatistics, ConsolidationError> {
        if !self.stateful {
            return Ok(self.params.neutral());
        }
        let histogram = self
            .store
            .lock()
            .load(source_id)
            .map_err(|e| self.unavailable("load", e))?;

        match histogram {
            Some(h) => {
                self.check_width(source_id, &h)?;
                Ok(self.params.statistics(&h))
            }
            None => Ok(self.params.neutral()),
        }
    }

    /// Identifiers of every stored source, sorted
    ///
    /// Always empty in stateless mode.
    pub fn source_ids(&self) -> Result<Vec<String>, ConsolidationError> {
        if !self.stateful {
            return Ok(Vec::new());
        }
        self.store
            .lock()
            .source_ids()
            .map_err(|e| self.unavailable("list", e))
    }

    /// Delete every source record, returning how many were removed
    ///
    /// Blocks until no session holds a lease; sessions that begin meanwhile
    /// wait for the clear to finish.
    pub fn clear_all(&self) -> Result<usize, ConsolidationError> {
        let mut leases = self.leases.lock();
        while leases.clearing {
            self.released.wait(&mut leases);
        }
        leases.clearing = true;
        while !leases.held.is_empty() {
            self.released.wait(&mut leases);
        }

        let removed = self
            .store
            .lock()
            .clear()
            .map_err(|e| self.unavailable("clear", e));

        leases.clearing = false;
        drop(leases);
        self.released.notify_all();
        removed
    }

    fn acquire(&self, ids: &BTreeSet<String>) {
        let mut leases = self.leases.lock();
        while leases.clearing || ids.iter().any(|id| leases.held.contains(id)) {
            self.released.wait(&mut leases);
        }
        leases.held.extend(ids.iter().cloned());
    }

    fn release(&self, ids: &[String]) {
        if ids.is_empty() {
            return;
        }
        let mut leases = self.leases.lock();
        for id in ids {
            leases.held.remove(id);
        }
        drop(leases);
        self.released.notify_all();
    }

    fn check_width(&self, source_id: &str, histogram: &Histogram) -> Result<(), ConsolidationError> {
        if histogram.tiers() != self.params.tiers {
            return Err(ConsolidationError::IncompatibleHistogram {
                source_id: source_id.to_string(),
                expected: self.params.tiers,
                found: histogram.tiers(),
            });
        }
        Ok(())
    }

    fn unavailable(&self, operation: &str, e: S::Error) -> ConsolidationError {
        error!(operation, error = %e, "Source store failed");
        ConsolidationError::LedgerUnavailable(format!("{} failed: {}", operation, e))
    }
}

/// Request-scoped view of the ledger
///
/// Holds the lease on its sources until committed or dropped.
pub struct LedgerSession<'a, S>
where
    S: SourceStore,
    S::Error: Display,
{
    ledger: &'a SourceLedger<S>,
    working: HashMap<String, Histogram>,
    dirty: BTreeSet<String>,
    lease: Vec<String>,
}

impl<'a, S> LedgerSession<'a, S>
where
    S: SourceStore,
    S::Error: Display,
{
    /// Current histogram of a source; empty if it has no history
    pub fn histogram(&self, source_id: &str) -> Histogram {
        self.working
            .get(source_id)
            .cloned()
            .unwrap_or_else(|| Histogram::new(self.ledger.params.tiers))
    }

    /// Probabilities and reputation of a source
    pub fn statistics(&self, source_id: &str) -> SourceStatistics {
        match self.working.get(source_id) {
            Some(h) => self.ledger.params.statistics(h),
            None => self.ledger.params.neutral(),
        }
    }

    /// Reputation of a source
    pub fn reputation_of(&self, source_id: &str) -> f64 {
        self.statistics(source_id).reputation
    }

    /// Replace a source's histogram with externally supplied counts
    pub fn seed(&mut self, source_id: &str, histogram: Histogram) -> Result<(), ConsolidationError> {
        if histogram.tiers() != self.ledger.params.tiers {
            return Err(ConsolidationError::MalformedSource {
                source_id: source_id.to_string(),
                reason: format!(
                    "expected {} ratings, got {}",
                    self.ledger.params.tiers,
                    histogram.tiers()
                ),
            });
        }
        self.working.insert(source_id.to_string(), histogram);
        self.dirty.insert(source_id.to_string());
        Ok(())
    }

    /// Increment one tier of a source's histogram, creating it if absent
    pub fn record_rating(&mut self, source_id: &str, tier: RatingTier) -> Result<(), ConsolidationError> {
        let tiers = self.ledger.params.tiers;
        self.working
            .entry(source_id.to_string())
            .or_insert_with(|| Histogram::new(tiers))
            .record(tier)?;
        self.dirty.insert(source_id.to_string());
        debug!(source_id, tier = tier.index(), "Rating recorded");
        Ok(())
    }

    /// Write every touched histogram back in one batch
    ///
    /// Returns the number of records written; always zero when stateless.
    pub fn commit(self) -> Result<usize, ConsolidationError> {
        if !self.ledger.stateful || self.dirty.is_empty() {
            return Ok(0);
        }

        let records: Vec<SourceRecord> = self
            .dirty
            .iter()
            .map(|id| SourceRecord::new(id.clone(), self.histogram(id)))
            .collect();

        self.ledger
            .store
            .lock()
            .save_all(&records)
            .map_err(|e| self.ledger.unavailable("save", e))?;

        debug!(records = records.len(), "Ledger session committed");
        Ok(records.len())
    }
}

impl<'a, S> Drop for LedgerSession<'a, S>
where
    S: SourceStore,
    S::Error: Display,
{
    fn drop(&mut self) {
        self.ledger.release(&self.lease);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skald_store::MemoryStore;
    use std::time::Duration;

    fn ledger(stateful: bool) -> SourceLedger<MemoryStore> {
        SourceLedger::new(MemoryStore::new(), ReputationParams::new(5, 1.0), stateful)
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_unknown_source_is_neutral() {
        let ledger = ledger(true);
        let session = ledger.begin(&ids(&["s1"])).unwrap();

        let stats = session.statistics("s1");
        assert_eq!(stats.reputation, 0.5);
        assert_eq!(stats.probabilities, vec![0.2; 5]);
        assert_eq!(session.histogram("s1"), Histogram::new(5));
    }

    #[test]
    fn test_ratings_visible_within_session() {
        let ledger = ledger(false);
        let mut session = ledger.begin(&ids(&["s1"])).unwrap();

        session.record_rating("s1", RatingTier::new(4)).unwrap();
        assert_eq!(session.histogram("s1").counts(), &[0, 0, 0, 0, 1]);
        assert!(session.reputation_of("s1") > 0.5);
    }

    #[test]
    fn test_commit_persists_when_stateful() {
        let ledger = ledger(true);
        let mut session = ledger.begin(&ids(&["s1"])).unwrap();
        session.record_rating("s1", RatingTier::new(2)).unwrap();
        assert_eq!(session.commit().unwrap(), 1);

        let session = ledger.begin(&ids(&["s1"])).unwrap();
        assert_eq!(session.histogram("s1").counts(), &[0, 0, 1, 0, 0]);
    }

    #[test]
    fn test_stateless_session_is_discarded() {
        let ledger = ledger(false);
        let mut session = ledger.begin(&ids(&["s1"])).unwrap();
        session.record_rating("s1", RatingTier::new(2)).unwrap();
        assert_eq!(session.commit().unwrap(), 0);

        assert!(ledger.store().is_empty());
        let session = ledger.begin(&ids(&["s1"])).unwrap();
        assert!(session.histogram("s1").is_empty());
    }

    #[test]
    fn test_dropped_session_commits_nothing() {
        let ledger = ledger(true);
        {
            let mut session = ledger.begin(&ids(&["s1"])).unwrap();
            session.record_rating("s1", RatingTier::new(0)).unwrap();
        }
        assert!(ledger.store().is_empty());
    }

    #[test]
    fn test_seed_replaces_histogram() {
        let ledger = ledger(true);
        let mut session = ledger.begin(&ids(&["s1"])).unwrap();
        session.record_rating("s1", RatingTier::new(0)).unwrap();
        session
            .seed("s1", Histogram::from_counts(vec![0, 0, 0, 0, 9]))
            .unwrap();

        assert_eq!(session.histogram("s1").counts(), &[0, 0, 0, 0, 9]);
    }

    #[test]
    fn test_seed_with_wrong_width_is_rejected() {
        let ledger = ledger(true);
        let mut session = ledger.begin(&ids(&["s1"])).unwrap();
        let err = session
            .seed("s1", Histogram::from_counts(vec![1, 2]))
            .unwrap_err();
        assert!(matches!(err, ConsolidationError::MalformedSource { .. }));
    }

    #[test]
    fn test_offline_store_is_unavailable() {
        let ledger = ledger(true);
        ledger.store().take_offline();

        let err = ledger.begin(&ids(&["s1"])).err().unwrap();
        assert!(matches!(err, ConsolidationError::LedgerUnavailable(_)));

        // The failed session released its lease
        ledger.store().bring_online();
        assert!(ledger.begin(&ids(&["s1"])).is_ok());
    }

    #[test]
    fn test_stored_histogram_of_other_width_is_incompatible() {
        let ledger = ledger(true);
        ledger
            .store()
            .save_all(&[SourceRecord::new("s1", Histogram::from_counts(vec![1, 1, 1]))])
            .unwrap();

        let err = ledger.begin(&ids(&["s1"])).err().unwrap();
        assert!(matches!(
            err,
            ConsolidationError::IncompatibleHistogram { expected: 5, found: 3, .. }
        ));
    }

    #[test]
    fn test_clear_all() {
        let ledger = ledger(true);
        let mut session = ledger.begin(&ids(&["a", "b"])).unwrap();
        session.record_rating("a", RatingTier::new(1)).unwrap();
        session.record_rating("b", RatingTier::new(1)).unwrap();
        session.commit().unwrap();

        assert_eq!(ledger.clear_all().unwrap(), 2);
        assert_eq!(ledger.clear_all().unwrap(), 0);
        assert_eq!(ledger.statistics("a").unwrap().reputation, 0.5);
    }

    #[test]
    fn test_clear_waits_for_open_sessions() {
        let ledger = ledger(true);
        let mut seeding = ledger.begin(&ids(&["s1"])).unwrap();
        seeding
            .seed("s1", Histogram::from_counts(vec![0, 0, 0, 0, 9]))
            .unwrap();
        seeding.commit().unwrap();

        let mut session = ledger.begin(&ids(&["s1"])).unwrap();
        std::thread::scope(|scope| {
            let clearing = scope.spawn(|| ledger.clear_all());

            std::thread::sleep(Duration::from_millis(50));
            assert!(!clearing.is_finished());

            session.record_rating("s1", RatingTier::new(0)).unwrap();
            session.commit().unwrap();

            assert_eq!(clearing.join().unwrap().unwrap(), 1);
        });

        assert_eq!(ledger.store().load("s1").unwrap(), None);
        assert_eq!(ledger.statistics("s1").unwrap().reputation, 0.5);
    }

    #[test]
    fn test_sessions_wait_for_clear() {
        let ledger = ledger(true);
        let session = ledger.begin(&ids(&["s1"])).unwrap();

        std::thread::scope(|scope| {
            let clearing = scope.spawn(|| ledger.clear_all());
            std::thread::sleep(Duration::from_millis(50));

            // Disjoint sources still queue behind the pending clear
            let other = scope.spawn(|| {
                let mut s = ledger.begin(&ids(&["s2"])).unwrap();
                s.record_rating("s2", RatingTier::new(3)).unwrap();
                s.commit().unwrap()
            });
            std::thread::sleep(Duration::from_millis(50));
            assert!(!other.is_finished());

            drop(session);
            assert_eq!(clearing.join().unwrap().unwrap(), 0);
            assert_eq!(other.join().unwrap(), 1);
        });

        assert_eq!(ledger.source_ids().unwrap(), vec!["s2".to_string()]);
    }

    #[test]
    fn test_source_ids_empty_when_stateless() {
        let ledger = ledger(false);
        ledger
            .store()
            .save_all(&[SourceRecord::new("s1", Histogram::new(5))])
            .unwrap();
        assert!(ledger.source_ids().unwrap().is_empty());
    }
}
