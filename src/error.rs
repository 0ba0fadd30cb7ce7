//! Error type shared by the query builder, relations, and executors.
//!
//! All fallible operations in this crate surface a `RiptideError`. Builder
//! mutators fail fast: a rejected call returns the error and leaves the
//! builder state untouched.

use std::fmt;

/// Error type for query building and execution
#[derive(Debug)]
pub enum RiptideError {
    /// Malformed query input: unknown operator, invalid sort direction,
    /// negative limit/offset, page < 1, aggregate query without aggregates,
    /// pivot operation on a non-pivot relation.
    InvalidQuery(String),
    /// A relation name was referenced that the entity does not declare
    RelationNotFound {
        model: &'static str,
        relation: String,
    },
    /// `find_or_fail` matched no row
    ModelNotFound {
        model: &'static str,
        id: serde_json::Value,
    },
    /// Opaque failure from the executor (connection loss, constraint
    /// violation, deadlock). The core never retries these.
    Database(String),
    /// Row-to-model mapping failure
    Parse(String),
}

impl fmt::Display for RiptideError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiptideError::InvalidQuery(s) => {
                write!(f, "Invalid query: {s}")
            }
            RiptideError::RelationNotFound { model, relation } => {
                write!(f, "Relation '{relation}' is not defined on {model}")
            }
            RiptideError::ModelNotFound { model, id } => {
                write!(f, "{model} not found for id {id}")
            }
            RiptideError::Database(s) => {
                write!(f, "Database error: {s}")
            }
            RiptideError::Parse(s) => {
                write!(f, "Parse error: {s}")
            }
        }
    }
}

impl std::error::Error for RiptideError {}
