//! JSON value to SeaQuery value conversion.
//!
//! Filter values travel through the builder as `serde_json::Value` and are
//! converted to `sea_query::Value` only at compilation time, so serialized
//! filter trees stay backend-neutral.

use sea_query::Value;

/// Convert a JSON value to a bindable SeaQuery value
///
/// Numbers map to `i64` when they are integral, `f64` otherwise. Arrays and
/// objects map to JSON-typed values (the `with-json` feature).
pub(crate) fn json_to_value(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::String(None),
        serde_json::Value::Bool(b) => (*b).into(),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.into()
            } else if let Some(u) = n.as_u64() {
                u.into()
            } else {
                n.as_f64().unwrap_or(f64::NAN).into()
            }
        }
        serde_json::Value::String(s) => s.clone().into(),
        other => Value::Json(Some(Box::new(other.clone()))),
    }
}

/// Convert a JSON array to a list of bindable values
///
/// Non-array input yields the value as a single-element list; condition
/// validation guarantees array operators never reach that path.
pub(crate) fn json_array_to_values(value: &serde_json::Value) -> Vec<Value> {
    match value.as_array() {
        Some(items) => items.iter().map(json_to_value).collect(),
        None => vec![json_to_value(value)],
    }
}

/// Render a value as a LIKE/ILIKE pattern string
pub(crate) fn like_pattern(value: &serde_json::Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}
