use serde_json::Value;

/// Flattens a chat message `content` field into plain text.
///
/// Strings pass through. Arrays of typed parts keep only `"text"` parts
/// with a non-empty `text`, joined by newlines. `null` becomes `""`; any
/// other value is rendered as JSON.
#[must_use]
pub fn extract_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter(|part| part.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
