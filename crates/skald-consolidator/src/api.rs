//! Request and response types of the consolidate and clear operations
//!
//! Field names are camelCase on the wire.

use serde::{Deserialize, Serialize};
use skald_domain::Fact;

/// Body of a consolidate request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationRequest {
    /// Objects to resolve, processed in order
    pub objects: Vec<ObjectPayload>,

    /// Optional seed histories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceSeed>>,
}

/// One object of a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectPayload {
    /// Name of the fact being resolved
    pub name: String,

    /// Datatype name: a base datatype or a composite one
    pub datatype: String,

    /// Competing claims
    #[serde(default)]
    pub claims: Vec<ClaimPayload>,
}

/// One claim of a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimPayload {
    /// Asserting source
    pub source_id: String,

    /// Asserted value
    pub fact: Fact,
}

/// Externally supplied history of a source
///
/// Derived fields a client may echo back (reputation, probabilities) are
/// ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSeed {
    /// Source identifier
    pub source_id: String,

    /// Histogram, exactly `K` counts
    pub ratings: Vec<u64>,
}

/// Body of a consolidate response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationResponse {
    /// RFC 3339 time at which the response was assembled
    pub timestamp: String,

    /// Resolved objects, in request order
    pub objects: Vec<ObjectResult>,

    /// Statistics of every source seen in the request
    pub sources: Vec<SourceReport>,
}

/// A resolved object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectResult {
    /// Object name
    pub name: String,

    /// Claims sorted by descending confidence
    pub claims: Vec<ClaimResult>,

    /// Set when the object could not be resolved; `claims` is then empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ObjectFailure>,
}

/// A ranked claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResult {
    /// Asserted value
    pub fact: Fact,

    /// Confidence in [0, 1]
    pub confidence: f64,

    /// Asserting source; absent on merged composite claims
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
}

/// Why an object was not resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectFailure {
    /// Error name, e.g. `IncomparableValue`
    pub kind: String,

    /// Human-readable message
    pub message: String,
}

/// Statistics of one source after the request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReport {
    /// Source identifier
    pub source_id: String,

    /// Point estimate in [0, 1]
    pub reputation: f64,

    /// Smoothed tier probabilities
    pub probabilities: Vec<f64>,

    /// Raw histogram
    pub ratings: Vec<u64>,
}

/// Body of a clear response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearResponse {
    /// Always `"cleared"`
    pub status: String,

    /// Number of source records deleted
    pub removed: usize,
}

impl ClearResponse {
    /// Confirmation for `removed` deleted records
    pub fn cleared(removed: usize) -> Self {
        Self {
            status: "cleared".to_string(),
            removed,
        }
    }
}

/// Body of a source listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcesResponse {
    /// Every stored source, sorted by identifier
    pub sources: Vec<SourceReport>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_parses_camel_case() {
        let request: ConsolidationRequest = serde_json::from_value(json!({
            "objects": [{
                "name": "height",
                "datatype": "continuous",
                "claims": [{"sourceId": "s1", "fact": 1.8}]
            }],
            "sources": [{"sourceId": "s1", "ratings": [0, 1], "reputation": 0.9}]
        }))
        .unwrap();

        assert_eq!(request.objects[0].claims[0].source_id, "s1");
        assert_eq!(request.objects[0].claims[0].fact, Fact::Number(1.8));
        let seeds = request.sources.unwrap();
        assert_eq!(seeds[0].ratings, vec![0, 1]);
    }

    #[test]
    fn test_sources_are_optional() {
        let request: ConsolidationRequest =
            serde_json::from_value(json!({"objects": []})).unwrap();
        assert!(request.sources.is_none());
    }

    #[test]
    fn test_claim_without_source_omits_field() {
        let claim = ClaimResult {
            fact: Fact::from("x"),
            confidence: 0.5,
            source_id: None,
        };
        assert_eq!(
            serde_json::to_value(&claim).unwrap(),
            json!({"fact": "x", "confidence": 0.5})
        );
    }

    #[test]
    fn test_successful_object_omits_error() {
        let object = ObjectResult {
            name: "x".to_string(),
            claims: vec![],
            error: None,
        };
        assert_eq!(
            serde_json::to_value(&object).unwrap(),
            json!({"name": "x", "claims": []})
        );
    }
}
