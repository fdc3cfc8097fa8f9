use serde_json::Value;
use sha2::{Digest, Sha256};

#[must_use]
pub fn sha256(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Drops blank strings so `Some("")` and `None` mean the same thing.
#[must_use]
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|x| !x.trim().is_empty())
}

#[must_use]
pub fn parse_boolean(input: Option<&Value>, fallback: bool) -> bool {
    let Some(value) = input else {
        return fallback;
    };

    match value {
        Value::Bool(v) => *v,
        Value::String(v) => parse_boolean_str(v).unwrap_or(fallback),
        Value::Number(v) => match v.as_i64() {
            Some(1) => true,
            Some(0) => false,
            _ => fallback,
        },
        _ => fallback,
    }
}

#[must_use]
pub fn parse_boolean_str(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Renders an option value the way it goes into a query string.
#[must_use]
pub fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

#[must_use]
pub fn char_len(value: &str) -> usize {
    value.chars().count()
}
