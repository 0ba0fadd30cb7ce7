//! Single filter predicate with construction-time validation.

use serde::Serialize;

use crate::error::RiptideError;
use crate::filter::operator::Operator;

/// One `(field, operator, value)` predicate
///
/// Construction is the only validation point; a condition is immutable once
/// built. Values are `serde_json::Value`, so any JSON-representable scalar
/// or array can participate in a filter.
///
/// # Example
///
/// ```
/// use riptide::{FilterCondition, Operator};
/// use serde_json::json;
///
/// let cond = FilterCondition::new("age", Operator::GreaterThanOrEqual, json!(18)).unwrap();
/// assert_eq!(cond.field(), "age");
///
/// // Array operators validate arity
/// assert!(FilterCondition::new("id", Operator::Between, json!([1])).is_err());
/// assert!(FilterCondition::new("id", Operator::In, json!(5)).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterCondition {
    field: String,
    operator: Operator,
    value: serde_json::Value,
}

impl FilterCondition {
    /// Build a validated condition
    ///
    /// # Errors
    ///
    /// Returns `RiptideError::InvalidQuery` when:
    /// - the operator requires a value and `value` is `null`
    /// - the operator requires an array and `value` is not an array
    /// - the operator is `BETWEEN`/`NOT BETWEEN` and the array is not
    ///   exactly two elements long
    pub fn new(
        field: impl Into<String>,
        operator: Operator,
        value: serde_json::Value,
    ) -> Result<Self, RiptideError> {
        let field = field.into();

        if operator.requires_value() && value.is_null() {
            return Err(RiptideError::InvalidQuery(format!(
                "operator {operator} on field '{field}' requires a value"
            )));
        }

        if operator.requires_array() {
            let Some(items) = value.as_array() else {
                return Err(RiptideError::InvalidQuery(format!(
                    "operator {operator} on field '{field}' requires an array value"
                )));
            };
            if matches!(operator, Operator::Between | Operator::NotBetween) && items.len() != 2 {
                return Err(RiptideError::InvalidQuery(format!(
                    "operator {operator} on field '{field}' requires exactly two bounds, got {}",
                    items.len()
                )));
            }
        }

        Ok(Self {
            field,
            operator,
            value,
        })
    }

    /// Two-argument sugar: `(field, value)` defaults the operator to `=`
    ///
    /// Disambiguation rule: when `value` is a string that parses as a known
    /// operator token, it is taken as the *operator* with no value — which
    /// then fails validation for value-requiring operators. A field
    /// legitimately valued as an operator-like string (e.g. `"="`) is
    /// therefore misclassified; callers that cannot rule such values out
    /// should use [`FilterCondition::new`] with an explicit operator.
    pub fn from_pair(
        field: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<Self, RiptideError> {
        if let Some(op) = value.as_str().and_then(Operator::parse) {
            return Self::new(field, op, serde_json::Value::Null);
        }
        Self::new(field, Operator::Equal, value)
    }

    /// The filtered field name
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The comparison operator
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// The comparison value (`null` for nullity operators)
    pub fn value(&self) -> &serde_json::Value {
        &self.value
    }

    /// Serialize as a `{field, operator, value}` dictionary
    pub fn to_dict(&self) -> serde_json::Value {
        serde_json::json!({
            "field": self.field,
            "operator": self.operator.as_str(),
            "value": self.value,
        })
    }

    /// Rebuild a condition from its dictionary form
    ///
    /// # Errors
    ///
    /// Returns `RiptideError::InvalidQuery` when the shape is not an object
    /// with `field` and `operator` keys, the operator token is unknown, or
    /// validation fails.
    pub fn from_dict(data: &serde_json::Value) -> Result<Self, RiptideError> {
        let obj = data.as_object().ok_or_else(|| {
            RiptideError::InvalidQuery("filter condition must be an object".to_string())
        })?;
        let field = obj.get("field").and_then(|f| f.as_str()).ok_or_else(|| {
            RiptideError::InvalidQuery("filter condition requires a 'field' key".to_string())
        })?;
        let token = obj.get("operator").and_then(|o| o.as_str()).ok_or_else(|| {
            RiptideError::InvalidQuery("filter condition requires an 'operator' key".to_string())
        })?;
        let operator = Operator::parse(token).ok_or_else(|| {
            RiptideError::InvalidQuery(format!("unknown operator: {token}"))
        })?;
        let value = obj.get("value").cloned().unwrap_or(serde_json::Value::Null);
        Self::new(field, operator, value)
    }
}
