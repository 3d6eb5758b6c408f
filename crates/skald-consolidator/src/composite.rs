//! Composite datatypes
//!
//! `list-string` and `list-categorical` facts are arrays whose elements each
//! become a claim of the base datatype. `address` facts are records; each
//! non-null field becomes a claim of a string sub-object named
//! `<object>-<field>`, resolved on its own.

use crate::api::ObjectPayload;
use crate::ConsolidationError;
use skald_domain::{Claim, Datatype, Fact, Object};
use std::collections::BTreeMap;

/// Any datatype accepted in a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// One of the base datatypes
    Base(Datatype),
    /// Array of strings
    ListString,
    /// Array of labels
    ListCategorical,
    /// Record of string fields
    Address,
}

impl ObjectKind {
    /// Parse a wire datatype name (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "list-string" => Some(ObjectKind::ListString),
            "list-categorical" => Some(ObjectKind::ListCategorical),
            "address" => Some(ObjectKind::Address),
            other => Datatype::parse(other).map(ObjectKind::Base),
        }
    }
}

/// A validated request object, ready to solve
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// Solved as one object
    Single(Object),

    /// Solved field by field, merged into one claim
    Record {
        /// Name of the composite object
        name: String,
        /// Field name and its sub-object, in field order
        fields: Vec<(String, Object)>,
    },
}

impl Plan {
    /// Validate a request object and expand it into base objects
    ///
    /// # Errors
    /// Returns [`ConsolidationError::MalformedObject`] when the object has no
    /// claims, an unknown datatype, an empty sourceId, a fact of the wrong
    /// shape for a composite datatype, or expands to nothing.
    pub fn build(payload: &ObjectPayload) -> Result<Self, ConsolidationError> {
        let malformed = |reason: String| ConsolidationError::MalformedObject {
            object: payload.name.clone(),
            reason,
        };

        if payload.claims.is_empty() {
            return Err(malformed("object has no claims".to_string()));
        }
        if payload.claims.iter().any(|c| c.source_id.trim().is_empty()) {
            return Err(malformed("claim with empty sourceId".to_string()));
        }
        let kind = ObjectKind::parse(&payload.datatype)
            .ok_or_else(|| malformed(format!("unsupported datatype '{}'", payload.datatype)))?;

        let plan = match kind {
            ObjectKind::Base(datatype) => {
                let claims = payload
                    .claims
                    .iter()
                    .map(|c| Claim::new(c.source_id.clone(), c.fact.clone()))
                    .collect();
                Plan::Single(Object::new(payload.name.clone(), datatype, claims))
            }
            ObjectKind::ListString | ObjectKind::ListCategorical => {
                let datatype = if kind == ObjectKind::ListString {
                    Datatype::String
                } else {
                    Datatype::Categorical
                };
                let mut claims = Vec::new();
                for claim in &payload.claims {
                    let Fact::List(items) = &claim.fact else {
                        return Err(malformed(format!(
                            "{} expects an array fact from source '{}'",
                            payload.datatype, claim.source_id
                        )));
                    };
                    claims.extend(items.iter().map(|item| Claim::new(claim.source_id.clone(), item.clone())));
                }
                if claims.is_empty() {
                    return Err(malformed("all lists are empty".to_string()));
                }
                Plan::Single(Object::new(payload.name.clone(), datatype, claims))
            }
            ObjectKind::Address => {
                let mut by_field: BTreeMap<String, Vec<Claim>> = BTreeMap::new();
                for claim in &payload.claims {
                    let Fact::Record(fields) = &claim.fact else {
                        return Err(malformed(format!(
                            "address expects an object fact from source '{}'",
                            claim.source_id
                        )));
                    };
                    for (field, value) in fields {
                        if let Some(value) = value {
                            by_field
                                .entry(field.clone())
                                .or_default()
                                .push(Claim::new(claim.source_id.clone(), value.clone()));
                        }
                    }
                }
                if by_field.is_empty() {
                    return Err(malformed("every address field is null".to_string()));
                }
                let fields = by_field
                    .into_iter()
                    .map(|(field, claims)| {
                        let name = format!("{}-{}", payload.name, field);
                        (field, Object::new(name, Datatype::String, claims))
                    })
                    .collect();
                Plan::Record {
                    name: payload.name.clone(),
                    fields,
                }
            }
        };
        Ok(plan)
    }

    /// Name of the object as requested
    pub fn name(&self) -> &str {
        match self {
            Plan::Single(object) => &object.name,
            Plan::Record { name, .. } => name,
        }
    }

    /// Source ids of every expanded claim, in order, with repeats
    pub fn source_ids(&self) -> impl Iterator<Item = &str> {
        let objects: Vec<&Object> = match self {
            Plan::Single(object) => vec![object],
            Plan::Record { fields, .. } => fields.iter().map(|(_, o)| o).collect(),
        };
        objects
            .into_iter()
            .flat_map(|o| o.claims.iter().map(|c| c.source_id.as_str()))
    }
}
