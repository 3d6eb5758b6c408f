//! Tier module - quantization of confidence into rating tiers

/// Rating tier: one of `K` discrete buckets a claim's confidence falls into
///
/// Tier `0` holds the lowest confidences and tier `K - 1` the highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RatingTier(usize);

impl RatingTier {
    /// Wrap a raw tier index
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Quantize a confidence into one of `tiers` buckets
    ///
    /// `tier = min(floor(confidence * K), K - 1)`, so a confidence of exactly
    /// `1.0` lands in the top tier. Confidences outside [0, 1] are clipped and
    /// NaN is treated as `0`.
    ///
    /// # Examples
    ///
    /// ```
    /// use skald_domain::RatingTier;
    ///
    /// assert_eq!(RatingTier::quantize(1.0, 5).index(), 4);
    /// assert_eq!(RatingTier::quantize(0.39, 5).index(), 1);
    /// ```
    pub fn quantize(confidence: f64, tiers: usize) -> Self {
        let top = tiers.saturating_sub(1);
        let c = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        let index = (c * tiers as f64).floor() as usize;
        Self(index.min(top))
    }

    /// Get the raw tier index
    pub fn index(&self) -> usize {
        self.0
    }
}
