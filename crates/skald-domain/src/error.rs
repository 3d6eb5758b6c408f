//! Domain error types

use crate::Datatype;
use thiserror::Error;

/// Errors raised by the consolidation core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Datatype name outside the supported set
    #[error("Unsupported datatype: {0}")]
    UnsupportedDatatype(String),

    /// A fact that cannot be read as its object's datatype
    #[error("Incomparable value {fact} for {datatype} datatype{}", source_suffix(.source_id))]
    IncomparableValue {
        /// Datatype the fact was expected to conform to
        datatype: Datatype,
        /// Rendering of the offending fact
        fact: String,
        /// Source that supplied the fact, when known
        source_id: Option<String>,
    },

    /// Object that cannot be consolidated at all
    #[error("Malformed object '{object}': {reason}")]
    MalformedObject {
        /// Object name
        object: String,
        /// What is wrong with it
        reason: String,
    },

    /// Rating tier outside the histogram
    #[error("Rating tier {tier} out of range for {tiers} tiers")]
    TierOutOfRange {
        /// Offending tier
        tier: usize,
        /// Histogram width
        tiers: usize,
    },
}

impl DomainError {
    /// Attach the supplying source to an [`DomainError::IncomparableValue`]
    pub fn with_source(self, source: &str) -> Self {
        match self {
            DomainError::IncomparableValue { datatype, fact, .. } => {
                DomainError::IncomparableValue {
                    datatype,
                    fact,
                    source_id: Some(source.to_string()),
                }
            }
            other => other,
        }
    }
}

fn source_suffix(source_id: &Option<String>) -> String {
    match source_id {
        Some(id) => format!(" (source '{}')", id),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomparable_message_names_source() {
        let err = DomainError::IncomparableValue {
            datatype: Datatype::Continuous,
            fact: "\"abc\"".to_string(),
            source_id: None,
        }
        .with_source("s1");

        let msg = err.to_string();
        assert!(msg.contains("continuous"));
        assert!(msg.contains("s1"));
    }

    #[test]
    fn test_with_source_leaves_other_variants() {
        let err = DomainError::UnsupportedDatatype("blob".to_string());
        assert_eq!(err.clone().with_source("s1"), err);
    }
}
