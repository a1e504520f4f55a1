//! Casting raw parameter strings to their declared types.
//!
//! Path, query, header and form values arrive as strings. Before schema
//! validation they are converted to the JSON type the contract declares.
//! A value that cannot be converted is left as a string so the schema check
//! reports the mismatch.

use serde_json::{Number, Value};

use crate::contract::ValueShape;

/// Cast the raw occurrences of one parameter to a JSON value.
///
/// `raw` holds every occurrence in order. Only `multi` arrays use more than
/// the first.
pub fn cast_values(shape: &ValueShape, raw: &[String]) -> Value {
    let Some(first) = raw.first() else {
        return Value::Null;
    };

    match shape.value_type.as_deref() {
        Some("array") => {
            let items: Vec<&str> = match shape.collection_format.delimiter() {
                Some(delimiter) => split_collection(first, delimiter),
                None => raw.iter().map(String::as_str).collect(),
            };
            Value::Array(
                items
                    .into_iter()
                    .map(|item| cast_scalar(shape.items_type.as_deref(), item))
                    .collect(),
            )
        }
        declared => cast_scalar(declared, first),
    }
}

fn split_collection(value: &str, delimiter: char) -> Vec<&str> {
    if value.is_empty() {
        return Vec::new();
    }
    value.split(delimiter).collect()
}

fn cast_scalar(declared: Option<&str>, value: &str) -> Value {
    let cast = match declared {
        Some("integer") => value.trim().parse::<i64>().ok().map(Value::from),
        Some("number") => value
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        Some("boolean") => match value.to_ascii_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    };
    cast.unwrap_or_else(|| Value::String(value.to_string()))
}
