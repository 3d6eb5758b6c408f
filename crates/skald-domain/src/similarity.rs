//! Similarity module - datatype-aware comparison of facts
//!
//! Every [`Datatype`] has one [`Similarity`] implementation. Implementations
//! turn raw [`Fact`]s into a typed value, score pairs of values in [0, 1] and
//! know how to pick a consensus value out of weighted claims.
//!
//! | Datatype    | Value    | Score                                      | Consensus               |
//! |-------------|----------|--------------------------------------------|-------------------------|
//! | string      | `String` | Jaro-Winkler on case-folded, trimmed text  | heaviest similar cluster |
//! | continuous  | `f64`    | `exp(-3 * abs(a - b) / spread)`            | weighted mean           |
//! | categorical | `String` | exact match                                | heaviest identical group |

use crate::{Datatype, DomainError, Fact};
use std::fmt;

/// Decay rate of continuous similarity per spread unit
pub const CONTINUOUS_DECAY: f64 = 3.0;

/// Datatype-specific comparison of facts
pub trait Similarity: Sized {
    /// Typed representation of a fact
    type Value: Clone + fmt::Debug;

    /// Datatype this implementation handles
    const DATATYPE: Datatype;

    /// Interpret a fact under this datatype
    ///
    /// # Errors
    /// Returns [`DomainError::IncomparableValue`] if the fact has no
    /// representation under this datatype
    fn coerce(fact: &Fact) -> Result<Self::Value, DomainError>;

    /// Build a comparator tuned to the values of one object
    fn calibrate(values: &[Self::Value]) -> Self;

    /// Score two values in [0, 1]; symmetric and reflexive
    fn similarity(&self, a: &Self::Value, b: &Self::Value) -> f64;

    /// Weighted consensus representation of `values`
    ///
    /// `values` must be non-empty and `weights` parallel to it. The default
    /// picks the value whose cluster (values scoring at least `threshold`
    /// against it) carries the most weight; ties go to the earliest value.
    fn consensus(&self, values: &[Self::Value], weights: &[f64], threshold: f64) -> Self::Value {
        heaviest_cluster(self, values, weights, threshold)
    }
}

fn heaviest_cluster<S: Similarity>(
    metric: &S,
    values: &[S::Value],
    weights: &[f64],
    threshold: f64,
) -> S::Value {
    let mut best: Option<(usize, f64)> = None;
    for (j, candidate) in values.iter().enumerate() {
        let support: f64 = values
            .iter()
            .zip(weights)
            .filter(|(v, _)| metric.similarity(v, candidate) >= threshold)
            .map(|(_, w)| *w)
            .sum();
        if best.map_or(true, |(_, b)| support > b) {
            best = Some((j, support));
        }
    }
    values[best.map_or(0, |(j, _)| j)].clone()
}

fn incomparable(datatype: Datatype, fact: &Fact) -> DomainError {
    DomainError::IncomparableValue {
        datatype,
        fact: fact.to_string(),
        source_id: None,
    }
}

/// Lexical similarity for free text
#[derive(Debug, Clone, Copy, Default)]
pub struct TextSimilarity;

impl Similarity for TextSimilarity {
    type Value = String;
    const DATATYPE: Datatype = Datatype::String;

    fn coerce(fact: &Fact) -> Result<String, DomainError> {
        match fact {
            Fact::Text(_) | Fact::Number(_) | Fact::Bool(_) => {
                Ok(fact.to_string().trim().to_lowercase())
            }
            _ => Err(incomparable(Self::DATATYPE, fact)),
        }
    }

    fn calibrate(_values: &[String]) -> Self {
        TextSimilarity
    }

    fn similarity(&self, a: &String, b: &String) -> f64 {
        if a == b {
            return 1.0;
        }
        // Fixed argument order keeps the score symmetric bit-for-bit
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        strsim::jaro_winkler(first, second).clamp(0.0, 1.0)
    }
}

/// Distance-based similarity for numbers
#[derive(Debug, Clone, Copy)]
pub struct ContinuousSimilarity {
    spread: f64,
}

impl ContinuousSimilarity {
    /// Comparator for an explicit spread
    ///
    /// Non-positive or non-finite spreads are replaced by `1.0`.
    pub fn with_spread(spread: f64) -> Self {
        let spread = if spread.is_finite() && spread > 0.0 {
            spread
        } else {
            1.0
        };
        Self { spread }
    }

    /// Spread the distances are normalized against
    pub fn spread(&self) -> f64 {
        self.spread
    }
}

impl Similarity for ContinuousSimilarity {
    type Value = f64;
    const DATATYPE: Datatype = Datatype::Continuous;

    fn coerce(fact: &Fact) -> Result<f64, DomainError> {
        let value = match fact {
            Fact::Number(n) => Some(*n),
            Fact::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        value
            .filter(|v| v.is_finite())
            .ok_or_else(|| incomparable(Self::DATATYPE, fact))
    }

    fn calibrate(values: &[f64]) -> Self {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self::with_spread(max - min)
    }

    fn similarity(&self, a: &f64, b: &f64) -> f64 {
        if a == b {
            return 1.0;
        }
        (-CONTINUOUS_DECAY * (a - b).abs() / self.spread).exp()
    }

    fn consensus(&self, values: &[f64], weights: &[f64], _threshold: f64) -> f64 {
        let total: f64 = weights.iter().sum();
        if !(total > 0.0) {
            return values.iter().sum::<f64>() / values.len() as f64;
        }
        values.iter().zip(weights).map(|(v, w)| v * w).sum::<f64>() / total
    }
}

/// Exact-match similarity for labels
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoricalSimilarity;

impl Similarity for CategoricalSimilarity {
    type Value = String;
    const DATATYPE: Datatype = Datatype::Categorical;

    fn coerce(fact: &Fact) -> Result<String, DomainError> {
        if fact.is_scalar() {
            Ok(fact.to_string())
        } else {
            Err(incomparable(Self::DATATYPE, fact))
        }
    }

    fn calibrate(_values: &[String]) -> Self {
        CategoricalSimilarity
    }

    fn similarity(&self, a: &String, b: &String) -> f64 {
        if a == b {
            1.0
        } else {
            0.0
        }
    }

    fn consensus(&self, values: &[String], weights: &[f64], _threshold: f64) -> String {
        // Only identical labels share weight, whatever the configured threshold
        heaviest_cluster(self, values, weights, 1.0)
    }
}

/// Compare two facts under a datatype
///
/// Continuous comparisons use a unit spread, so the score is
/// `exp(-3 * abs(a - b))`; use [`continuous_similarity`] to supply the spread
/// of a wider population. Within an object the solver normalizes against the
/// spread of all of its claims.
///
/// # Examples
///
/// ```
/// use skald_domain::{Datatype, Fact};
/// use skald_domain::similarity::similarity;
///
/// let a = Fact::from("A");
/// assert_eq!(similarity(&a, &a, Datatype::Categorical).unwrap(), 1.0);
/// assert_eq!(similarity(&a, &Fact::from("B"), Datatype::Categorical).unwrap(), 0.0);
/// ```
pub fn similarity(a: &Fact, b: &Fact, datatype: Datatype) -> Result<f64, DomainError> {
    match datatype {
        Datatype::String => pairwise(&TextSimilarity, a, b),
        Datatype::Continuous => pairwise(&ContinuousSimilarity::with_spread(1.0), a, b),
        Datatype::Categorical => pairwise(&CategoricalSimilarity, a, b),
    }
}

/// Compare two numeric facts with distances normalized against `spread`
///
/// Non-positive or non-finite spreads fall back to `1.0`.
pub fn continuous_similarity(a: &Fact, b: &Fact, spread: f64) -> Result<f64, DomainError> {
    pairwise(&ContinuousSimilarity::with_spread(spread), a, b)
}

/// Compare two facts under a datatype given by name
///
/// # Errors
/// Returns [`DomainError::UnsupportedDatatype`] for unknown names
pub fn similarity_by_name(a: &Fact, b: &Fact, datatype: &str) -> Result<f64, DomainError> {
    similarity(a, b, datatype.parse()?)
}

fn pairwise<S: Similarity>(metric: &S, a: &Fact, b: &Fact) -> Result<f64, DomainError> {
    let va = S::coerce(a)?;
    let vb = S::coerce(b)?;
    Ok(metric.similarity(&va, &vb).clamp(0.0, 1.0))
}
