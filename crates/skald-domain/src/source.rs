//! Source module - the persisted rating history of a source

use crate::{DomainError, RatingTier};
use serde::{Deserialize, Serialize};

/// Rating-tier histogram of a source
///
/// `counts[i]` is how many of the source's claims were quantized into tier `i`.
/// The width is the deployment's `K`; histograms of a different width are
/// incompatible and are never resized implicitly.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Histogram(Vec<u64>);

impl Histogram {
    /// Create an empty histogram with `tiers` buckets
    pub fn new(tiers: usize) -> Self {
        Self(vec![0; tiers])
    }

    /// Wrap existing counts
    pub fn from_counts(counts: Vec<u64>) -> Self {
        Self(counts)
    }

    /// Per-tier counts
    pub fn counts(&self) -> &[u64] {
        &self.0
    }

    /// Number of tiers
    pub fn tiers(&self) -> usize {
        self.0.len()
    }

    /// Total number of ratings recorded, saturating at `u64::MAX`
    pub fn total(&self) -> u64 {
        self.0.iter().fold(0u64, |acc, c| acc.saturating_add(*c))
    }

    /// Total number of ratings, or `None` if it does not fit a `u64`
    pub fn checked_total(&self) -> Option<u64> {
        self.0.iter().try_fold(0u64, |acc, c| acc.checked_add(*c))
    }

    /// Whether no rating has ever been recorded
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|c| *c == 0)
    }

    /// Record one rating in the given tier
    ///
    /// # Errors
    /// Returns [`DomainError::TierOutOfRange`] if the tier does not fit the histogram
    pub fn record(&mut self, tier: RatingTier) -> Result<(), DomainError> {
        let tiers = self.0.len();
        let slot = self.0.get_mut(tier.index()).ok_or(DomainError::TierOutOfRange {
            tier: tier.index(),
            tiers,
        })?;
        *slot = slot.saturating_add(1);
        Ok(())
    }
}

/// A source and its histogram, as persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Source identifier
    pub source_id: String,

    /// Accumulated ratings
    pub ratings: Histogram,
}

impl SourceRecord {
    /// Create a new source record
    pub fn new(source_id: impl Into<String>, ratings: Histogram) -> Self {
        Self {
            source_id: source_id.into(),
            ratings,
        }
    }
}
