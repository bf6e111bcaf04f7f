//! Numeric coercion of submission answers.
//!
//! Answers arrive as text. Before a flat dict is stored as JSON, the values
//! of integer and decimal fields are turned into JSON numbers.

use std::collections::HashSet;

use serde_json::{Map, Number, Value as JsonValue};

/// Result of numeric checking - either a parsed number or the original string.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericValue {
    Int(i64),
    Float(f64),
    Str(String),
}

/// Integer if the text parses as one, else float (NaN becomes `Int(0)`),
/// else the text unchanged.
pub fn numeric_checker(string_value: &str) -> NumericValue {
    if let Ok(i) = string_value.parse::<i64>() {
        return NumericValue::Int(i);
    }

    if let Ok(f) = string_value.parse::<f64>() {
        if f.is_nan() {
            return NumericValue::Int(0);
        }
        return NumericValue::Float(f);
    }

    NumericValue::Str(string_value.to_string())
}

impl From<NumericValue> for JsonValue {
    /// Infinite floats have no JSON form and stay strings.
    fn from(value: NumericValue) -> Self {
        match value {
            NumericValue::Int(i) => JsonValue::Number(i.into()),
            NumericValue::Float(f) => match Number::from_f64(f) {
                Some(n) => JsonValue::Number(n),
                None => JsonValue::String(f.to_string()),
            },
            NumericValue::Str(s) => JsonValue::String(s),
        }
    }
}

/// Convert, in place, the string values of numeric fields in a flat dict
/// rendered as JSON.
///
/// A top-level key matches when it is listed in `numeric_fields`. Inside a
/// group or repeat row a key matches once prefixed with its parent's path,
/// or as is when it is already root-relative (contains a `/`). Lists of
/// strings under a numeric key are converted element by element.
pub fn numeric_converter(json: &mut JsonValue, numeric_fields: &HashSet<String>) {
    match json {
        JsonValue::Object(object) => convert_object(object, numeric_fields, None),
        JsonValue::Array(items) => {
            for item in items {
                numeric_converter(item, numeric_fields);
            }
        }
        _ => {}
    }
}

fn convert_object(
    object: &mut Map<String, JsonValue>,
    fields: &HashSet<String>,
    parent: Option<&str>,
) {
    for (key, value) in object.iter_mut() {
        let path = match parent {
            Some(parent) => format!("{parent}/{key}"),
            None => key.clone(),
        };
        let numeric = match parent {
            None => fields.contains(key),
            Some(_) => fields.contains(&path) || (key.contains('/') && fields.contains(key)),
        };

        match value {
            JsonValue::String(text) if numeric => *value = numeric_checker(text).into(),
            JsonValue::Object(inner) => convert_object(inner, fields, Some(&path)),
            JsonValue::Array(items) => {
                for item in items.iter_mut() {
                    match item {
                        JsonValue::String(text) if numeric => *item = numeric_checker(text).into(),
                        JsonValue::Object(row) => convert_object(row, fields, Some(&path)),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
}
