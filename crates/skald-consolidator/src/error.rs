//! Error types for consolidation

use skald_domain::DomainError;
use thiserror::Error;

/// Errors that can occur while consolidating a request
#[derive(Error, Debug)]
pub enum ConsolidationError {
    /// Object that cannot be consolidated (no claims, unknown datatype, bad shape)
    #[error("Malformed object '{object}': {reason}")]
    MalformedObject {
        /// Object name
        object: String,
        /// What is wrong with it
        reason: String,
    },

    /// Seed source that does not fit the deployment
    #[error("Malformed source '{source_id}': {reason}")]
    MalformedSource {
        /// Source identifier, possibly empty
        source_id: String,
        /// What is wrong with it
        reason: String,
    },

    /// Stored histogram whose width differs from the configured K
    #[error("Incompatible histogram for source '{source_id}': expected {expected} tiers, found {found}")]
    IncompatibleHistogram {
        /// Source identifier
        source_id: String,
        /// Configured K
        expected: usize,
        /// Width of the stored histogram
        found: usize,
    },

    /// Backing store unreachable; nothing was committed
    #[error("Source ledger unavailable: {0}")]
    LedgerUnavailable(String),

    /// Engine configuration out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error raised by the consolidation core
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl ConsolidationError {
    /// Short machine-readable name of the error
    pub fn kind(&self) -> &'static str {
        match self {
            ConsolidationError::MalformedObject { .. } => "MalformedObject",
            ConsolidationError::MalformedSource { .. } => "MalformedSource",
            ConsolidationError::IncompatibleHistogram { .. } => "IncompatibleHistogram",
            ConsolidationError::LedgerUnavailable(_) => "LedgerUnavailable",
            ConsolidationError::InvalidConfig(_) => "InvalidConfig",
            ConsolidationError::Domain(e) => domain_kind(e),
        }
    }

    /// Whether the caller can fix the error by changing the request
    pub fn is_client_error(&self) -> bool {
        match self {
            ConsolidationError::MalformedObject { .. } | ConsolidationError::MalformedSource { .. } => true,
            ConsolidationError::Domain(e) => !matches!(e, DomainError::TierOutOfRange { .. }),
            _ => false,
        }
    }
}

/// Short machine-readable name of a domain error
pub fn domain_kind(error: &DomainError) -> &'static str {
    match error {
        DomainError::UnsupportedDatatype(_) => "UnsupportedDatatype",
        DomainError::IncomparableValue { .. } => "IncomparableValue",
        DomainError::MalformedObject { .. } => "MalformedObject",
        DomainError::TierOutOfRange { .. } => "TierOutOfRange",
    }
}
