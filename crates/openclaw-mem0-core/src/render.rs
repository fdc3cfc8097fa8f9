use serde_json::Value;

pub const MEMORIES_OPEN_TAG: &str = "<relevant_memories>";
pub const MEMORIES_CLOSE_TAG: &str = "</relevant_memories>";

/// Display text of a memory record: `memory`, falling back to `text`.
#[must_use]
pub fn memory_text(record: &Value) -> Option<&str> {
    record
        .get("memory")
        .and_then(Value::as_str)
        .or_else(|| record.get("text").and_then(Value::as_str))
}

/// Markdown bullet list of the records, wrapped in the memory tags. Empty
/// when there is nothing to show.
#[must_use]
pub fn build_memories_block(records: &[Value]) -> String {
    let lines = records
        .iter()
        .filter_map(memory_text)
        .map(|text| format!("- {text}"))
        .collect::<Vec<_>>();

    if lines.is_empty() {
        return String::new();
    }

    format!(
        "\n{MEMORIES_OPEN_TAG}\n{}\n{MEMORIES_CLOSE_TAG}\n",
        lines.join("\n")
    )
}
