//! Join-key resolution shared by every reader in the pipeline.

use serde_json::{Map, Value};

/// Accepted spellings of the record identifier, in priority order.
pub const ID_FIELDS: [&str; 3] = ["id", "example_id", "exampleId"];

/// Resolve the identifier of a dataset, generation or judged record.
///
/// Returns the first field in [`ID_FIELDS`] holding a non-empty string or a
/// number (rendered as its JSON text). Nulls, empty strings and other JSON
/// types are passed over.
pub fn resolve_id(record: &Map<String, Value>) -> Option<String> {
    ID_FIELDS
        .iter()
        .filter_map(|field| record.get(*field))
        .find_map(id_text)
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
