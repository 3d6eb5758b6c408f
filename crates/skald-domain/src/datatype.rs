//! Datatype module - how the facts of an object are compared

use crate::DomainError;
use std::fmt;

/// Datatype of an object's facts
///
/// Closed set of variants; each one maps onto a [`crate::similarity::Similarity`]
/// implementation:
/// - String: free text, compared by lexical similarity
/// - Continuous: numbers, compared by normalized distance
/// - Categorical: labels, compared by exact match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Datatype {
    /// Free text
    String,

    /// Numeric measurement
    Continuous,

    /// Discrete label
    Categorical,
}

impl Datatype {
    /// All supported datatypes
    pub const ALL: [Datatype; 3] = [Datatype::String, Datatype::Continuous, Datatype::Categorical];

    /// Get the datatype name as used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Datatype::String => "string",
            Datatype::Continuous => "continuous",
            Datatype::Categorical => "categorical",
        }
    }

    /// Parse a datatype from its wire name (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "string" => Some(Datatype::String),
            "continuous" => Some(Datatype::Continuous),
            "categorical" => Some(Datatype::Categorical),
            _ => None,
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Datatype {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| DomainError::UnsupportedDatatype(s.to_string()))
    }
}
