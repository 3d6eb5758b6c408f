//! Claim module - the unit of evidence a source contributes

use crate::Datatype;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A value asserted by a source
///
/// Facts are untyped on the wire; the owning object's [`Datatype`] decides how
/// they are interpreted. Lists and records only appear in composite objects
/// and are flattened before they reach the solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Fact {
    /// JSON boolean
    Bool(bool),

    /// JSON number (integers are widened)
    Number(f64),

    /// JSON string
    Text(String),

    /// JSON array
    List(Vec<Fact>),

    /// JSON object; `None` marks an explicit null field
    Record(BTreeMap<String, Option<Fact>>),
}

impl Fact {
    /// Whether this fact is a scalar (bool, number or text)
    pub fn is_scalar(&self) -> bool {
        matches!(self, Fact::Bool(_) | Fact::Number(_) | Fact::Text(_))
    }
}

impl From<&str> for Fact {
    fn from(value: &str) -> Self {
        Fact::Text(value.to_string())
    }
}

impl From<f64> for Fact {
    fn from(value: f64) -> Self {
        Fact::Number(value)
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fact::Bool(b) => write!(f, "{}", b),
            Fact::Number(n) => write!(f, "{}", n),
            Fact::Text(s) => f.write_str(s),
            Fact::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Fact::Record(fields) => {
                f.write_str("{")?;
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match value {
                        Some(v) => write!(f, "{}: {}", key, v)?,
                        None => write!(f, "{}: null", key)?,
                    }
                }
                f.write_str("}")
            }
        }
    }
}

/// A single source's assertion about an object
#[derive(Debug, Clone, PartialEq)]
pub struct Claim {
    /// Identifier of the asserting source
    pub source_id: String,

    /// Asserted value
    pub fact: Fact,
}

impl Claim {
    /// Create a new claim
    pub fn new(source_id: impl Into<String>, fact: impl Into<Fact>) -> Self {
        Self {
            source_id: source_id.into(),
            fact: fact.into(),
        }
    }
}

/// A claim after consolidation, carrying its confidence
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredClaim {
    /// Identifier of the asserting source
    pub source_id: String,

    /// Asserted value
    pub fact: Fact,

    /// Confidence in [0, 1]
    pub confidence: f64,
}

/// An object to resolve: a name, a datatype and its competing claims
///
/// Names need not be unique within a request; every object is an
/// independent resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    /// Name of the fact being resolved
    pub name: String,

    /// How the claims' facts are compared
    pub datatype: Datatype,

    /// Competing claims, in input order
    pub claims: Vec<Claim>,
}

impl Object {
    /// Create a new object
    pub fn new(name: impl Into<String>, datatype: Datatype, claims: Vec<Claim>) -> Self {
        Self {
            name: name.into(),
            datatype,
            claims,
        }
    }
}
