//! Personal-data masking.
//!
//! Applied to every sampled record before it leaves this crate, so nothing
//! personal-data-shaped ever reaches a prompt or the persisted model.
//! Matching is a substring check on lowercased keys; masking recurses through
//! nested objects and arrays.

use serde_json::{Map, Value};

const PERSONAL_MARKERS: [&str; 17] = [
    "name", "email", "phone", "mobile", "address", "street", "city", "zip", "postal", "ssn",
    "fiscal", "vat", "tax", "birth", "dob", "password", "token",
];

pub fn is_personal_key(key: &str) -> bool {
    let lowered = key.to_lowercase();
    PERSONAL_MARKERS.iter().any(|marker| lowered.contains(marker))
}

/// Mask a value wholesale: numbers become `0`, strings `"***"`, containers
/// are masked element by element. Booleans and nulls pass through.
pub fn anonymize_value(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::Bool(b) => Value::Bool(*b),
        Value::Number(_) => Value::Number(0.into()),
        Value::String(_) => Value::String("***".to_string()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), anonymize_value(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(anonymize_value).collect()),
    }
}

/// Mask one record: personal keys are masked wholesale, non-personal nested
/// objects are walked recursively, non-personal scalars pass through.
pub fn anonymize_document(document: &Map<String, Value>) -> Map<String, Value> {
    document
        .iter()
        .map(|(key, value)| {
            let masked = if is_personal_key(key) {
                anonymize_value(value)
            } else {
                match value {
                    Value::Object(map) => Value::Object(anonymize_document(map)),
                    Value::Array(items) => Value::Array(
                        items
                            .iter()
                            .map(|item| match item {
                                Value::Object(map) => Value::Object(anonymize_document(map)),
                                other => other.clone(),
                            })
                            .collect(),
                    ),
                    other => other.clone(),
                }
            };
            (key.clone(), masked)
        })
        .collect()
}

/// Convenience for records that arrive as a whole [`Value`].
pub fn anonymize_record(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(anonymize_document(map)),
        other => other.clone(),
    }
}
