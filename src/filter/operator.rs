//! Comparison operator catalog.
//!
//! Every operator string used anywhere in the engine must map to one of
//! these variants; unknown operators are rejected when a condition is
//! constructed, never later.

use serde::{Deserialize, Serialize};

/// Comparison operators supported by filter conditions
///
/// # Example
///
/// ```
/// use riptide::Operator;
///
/// assert_eq!(Operator::parse(">="), Some(Operator::GreaterThanOrEqual));
/// assert_eq!(Operator::parse("IS NULL"), Some(Operator::Null));
/// assert_eq!(Operator::parse("bogus"), None);
///
/// assert!(!Operator::Null.requires_value());
/// assert!(Operator::In.requires_array());
/// assert!(Operator::ILike.is_pattern_match());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterThanOrEqual,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessThanOrEqual,
    #[serde(rename = "LIKE")]
    Like,
    #[serde(rename = "ILIKE")]
    ILike,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "NOT IN")]
    NotIn,
    #[serde(rename = "IS NULL")]
    Null,
    #[serde(rename = "IS NOT NULL")]
    NotNull,
    #[serde(rename = "BETWEEN")]
    Between,
    #[serde(rename = "NOT BETWEEN")]
    NotBetween,
}

impl Operator {
    /// All operators, in catalog order
    pub const ALL: [Operator; 14] = [
        Operator::Equal,
        Operator::NotEqual,
        Operator::GreaterThan,
        Operator::GreaterThanOrEqual,
        Operator::LessThan,
        Operator::LessThanOrEqual,
        Operator::Like,
        Operator::ILike,
        Operator::In,
        Operator::NotIn,
        Operator::Null,
        Operator::NotNull,
        Operator::Between,
        Operator::NotBetween,
    ];

    /// The operator's SQL token spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            Operator::Like => "LIKE",
            Operator::ILike => "ILIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Null => "IS NULL",
            Operator::NotNull => "IS NOT NULL",
            Operator::Between => "BETWEEN",
            Operator::NotBetween => "NOT BETWEEN",
        }
    }

    /// Parse an operator token, `None` when unrecognized
    ///
    /// Matching is exact: `"LIKE"` parses, `"like"` does not. This mirrors
    /// the operator-or-value disambiguation rule in
    /// [`FilterCondition::from_pair`](crate::FilterCondition::from_pair),
    /// which must not widen the set of strings treated as operators.
    pub fn parse(token: &str) -> Option<Operator> {
        Operator::ALL.iter().copied().find(|op| op.as_str() == token)
    }

    /// True when the token names a known operator
    pub fn validate(token: &str) -> bool {
        Operator::parse(token).is_some()
    }

    /// True unless the operator is a nullity check (`IS NULL` / `IS NOT NULL`)
    pub fn requires_value(&self) -> bool {
        !matches!(self, Operator::Null | Operator::NotNull)
    }

    /// True when the operator takes an array value (`IN` / `NOT IN` /
    /// `BETWEEN` / `NOT BETWEEN`)
    pub fn requires_array(&self) -> bool {
        matches!(
            self,
            Operator::In | Operator::NotIn | Operator::Between | Operator::NotBetween
        )
    }

    /// True for the pattern-match operators (`LIKE` / `ILIKE`)
    pub fn is_pattern_match(&self) -> bool {
        matches!(self, Operator::Like | Operator::ILike)
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
