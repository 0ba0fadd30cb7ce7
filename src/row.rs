//! Raw row representation and the `FromRow` mapping contract.
//!
//! Executors return query results as `Row` values: ordered maps of column
//! name to JSON value. The core never interprets rows itself beyond key
//! lookup; turning a row into a model is the `FromRow` implementor's job.

use serde::Serialize;

use crate::error::RiptideError;

/// A single result row as returned by an [`Executor`](crate::Executor)
///
/// # Example
///
/// ```
/// use riptide::Row;
/// use serde_json::json;
///
/// let row = Row::from_pairs([("id", json!(1)), ("name", json!("Alice"))]);
/// assert_eq!(row.get_i64("id"), Some(1));
/// assert_eq!(row.get_str("name"), Some("Alice"));
/// assert!(row.get("missing").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Row {
    values: serde_json::Map<String, serde_json::Value>,
}

impl Row {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from `(column, value)` pairs
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, serde_json::Value)>,
        K: Into<String>,
    {
        let mut values = serde_json::Map::new();
        for (key, value) in pairs {
            values.insert(key.into(), value);
        }
        Self { values }
    }

    /// Set a column value, replacing any existing one
    pub fn set(&mut self, column: impl Into<String>, value: serde_json::Value) {
        self.values.insert(column.into(), value);
    }

    /// Get a column value
    pub fn get(&self, column: &str) -> Option<&serde_json::Value> {
        self.values.get(column)
    }

    /// Get a column as `i64`
    pub fn get_i64(&self, column: &str) -> Option<i64> {
        self.values.get(column).and_then(|v| v.as_i64())
    }

    /// Get a column as `u64`
    pub fn get_u64(&self, column: &str) -> Option<u64> {
        self.values.get(column).and_then(|v| v.as_u64())
    }

    /// Get a column as `&str`
    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.values.get(column).and_then(|v| v.as_str())
    }

    /// Get a column as `bool`
    pub fn get_bool(&self, column: &str) -> Option<bool> {
        self.values.get(column).and_then(|v| v.as_bool())
    }

    /// Number of columns in the row
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the row carries no columns
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(column, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.values.iter()
    }
}

/// Conversion from a raw [`Row`] into a model instance
///
/// Implementations belong to the consumer; the core only requires that
/// failures are reported as [`RiptideError::Parse`] so they can be
/// distinguished from database failures.
pub trait FromRow: Sized {
    /// Build a model from a result row
    ///
    /// # Errors
    ///
    /// Returns `RiptideError::Parse` when a required column is missing or
    /// has an unexpected shape.
    fn from_row(row: &Row) -> Result<Self, RiptideError>;
}
