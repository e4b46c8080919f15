use serde_json::{Map, Value};

use crate::identity::resolve_id;

/// One JSONL row. Generations and judged records stay untyped so passthrough
/// fields survive the pipeline untouched.
pub type Record = Map<String, Value>;

/// Output field carrying the binary judgement.
pub const SCORE_FIELD: &str = "score";
/// Output field carrying the judge's rationale.
pub const EXPLANATION_FIELD: &str = "explanation";
/// Output field for the reference media locator.
pub const IMAGE_FIELD: &str = "image";

/// A dataset entry describing one evaluation task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Example {
    pub id: String,
    pub prompt: String,
    pub rubric: String,
    pub category: String,
    pub media: Option<Value>,
}

impl Example {
    /// Build an example from a dataset row. Rows without an identifier are
    /// not examples and yield `None`.
    pub fn from_record(record: &Record) -> Option<Self> {
        let id = resolve_id(record)?;
        Some(Self {
            id,
            prompt: text_field(record, "prompt"),
            rubric: first_text(record, &["rubric", "reference"]).unwrap_or_default(),
            category: text_field(record, "category"),
            media: first_present(record, &["media_url", "image"]).cloned(),
        })
    }
}

/// Render a JSON value as plain text: strings verbatim, null as empty,
/// anything else as its JSON text.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub(crate) fn text_field(record: &Record, key: &str) -> String {
    record.get(key).map(value_text).unwrap_or_default()
}

/// First field among `keys` whose value renders to non-empty text.
pub(crate) fn first_text(record: &Record, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| record.get(*k))
        .map(value_text)
        .find(|s| !s.is_empty())
}

/// First field among `keys` that is present and not null.
pub(crate) fn first_present<'a>(record: &'a Record, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| record.get(*k))
        .find(|v| !v.is_null())
}

/// Candidate text of a generation: `response`, else `generation`, else empty.
pub fn response_text(record: &Record) -> String {
    first_text(record, &["response", "generation"]).unwrap_or_default()
}
