//! Reputation module - Bayesian bookkeeping over rating histograms
//!
//! A source's histogram is turned into a Laplace-smoothed multinomial
//! probability vector, and that vector into a scalar point estimate:
//!
//! ```text
//! probabilities[i] = (histogram[i] + LF) / (sum(histogram) + K * LF)
//! reputation       = sum(i * probabilities[i]) / (K - 1)
//! ```

use crate::Histogram;

/// Reputation assigned to a source without history
pub const NEUTRAL_REPUTATION: f64 = 0.5;

/// Parameters shared by every source of a deployment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReputationParams {
    /// Number of rating tiers (`K`, histogram width)
    pub tiers: usize,

    /// Additive smoothing factor (`LF`)
    pub laplace_factor: f64,
}

/// Statistics derived from a histogram, never persisted
#[derive(Debug, Clone, PartialEq)]
pub struct SourceStatistics {
    /// Smoothed probability of each tier; sums to 1
    pub probabilities: Vec<f64>,

    /// Point estimate in [0, 1]
    pub reputation: f64,
}

impl ReputationParams {
    /// Create reputation parameters
    pub fn new(tiers: usize, laplace_factor: f64) -> Self {
        Self {
            tiers,
            laplace_factor,
        }
    }

    /// Statistics of a source that has never been rated
    pub fn neutral(&self) -> SourceStatistics {
        SourceStatistics {
            probabilities: self.uniform(),
            reputation: NEUTRAL_REPUTATION,
        }
    }

    /// Derive probabilities and reputation from a histogram
    ///
    /// An empty histogram yields the neutral statistics. Counts beyond the
    /// configured width are ignored and missing tiers count as zero.
    pub fn statistics(&self, histogram: &Histogram) -> SourceStatistics {
        if histogram.is_empty() {
            return self.neutral();
        }
        let probabilities = self.probabilities(histogram);
        let reputation = self.point_estimate(&probabilities);
        SourceStatistics {
            probabilities,
            reputation,
        }
    }

    /// Laplace-smoothed multinomial probabilities
    ///
    /// With `LF = 0` unseen tiers get probability zero. When the denominator
    /// is zero (no ratings and `LF = 0`) the uniform vector is returned.
    pub fn probabilities(&self, histogram: &Histogram) -> Vec<f64> {
        let k = self.tiers;
        let lf = self.laplace_factor;
        let count = |i: usize| histogram.counts().get(i).copied().unwrap_or(0);

        // Summed as f64 so huge counts cannot overflow
        let total: f64 = (0..k).map(|i| count(i) as f64).sum();
        let denominator = total + k as f64 * lf;
        if !(denominator > 0.0) {
            return self.uniform();
        }

        (0..k)
            .map(|i| (count(i) as f64 + lf) / denominator)
            .collect()
    }

    /// Point estimate: expected tier rescaled to [0, 1]
    ///
    /// With a single tier there is no scale to speak of and the neutral
    /// reputation is returned.
    pub fn point_estimate(&self, probabilities: &[f64]) -> f64 {
        if self.tiers < 2 {
            return NEUTRAL_REPUTATION;
        }
        let expected: f64 = probabilities
            .iter()
            .enumerate()
            .map(|(i, p)| i as f64 * p)
            .sum();
        expected / (self.tiers - 1) as f64
    }

    fn uniform(&self) -> Vec<f64> {
        let k = self.tiers.max(1);
        vec![1.0 / k as f64; self.tiers]
    }
}
