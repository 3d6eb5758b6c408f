//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! Infrastructure implementations live in other crates.

use crate::{Histogram, SourceRecord};
use std::collections::HashMap;

/// Trait for loading and saving source histograms
///
/// Implemented by the infrastructure layer (skald-store). Only histograms are
/// persisted; probabilities and reputations are always recomputed.
pub trait SourceStore {
    /// Error type for store operations
    type Error;

    /// Load the histogram of one source, if it has ever been rated
    fn load(&self, source_id: &str) -> Result<Option<Histogram>, Self::Error>;

    /// Load the histograms of several sources
    ///
    /// Sources without a record are absent from the returned map.
    fn load_many(&self, source_ids: &[String]) -> Result<HashMap<String, Histogram>, Self::Error> {
        let mut found = HashMap::with_capacity(source_ids.len());
        for id in source_ids {
            if let Some(histogram) = self.load(id)? {
                found.insert(id.clone(), histogram);
            }
        }
        Ok(found)
    }

    /// Insert or replace a batch of records atomically
    ///
    /// Either every record is written or none is.
    fn save_all(&mut self, records: &[SourceRecord]) -> Result<(), Self::Error>;

    /// Delete every record, returning how many were removed
    fn clear(&mut self) -> Result<usize, Self::Error>;

    /// Identifiers of every stored source, sorted
    fn source_ids(&self) -> Result<Vec<String>, Self::Error>;
}
