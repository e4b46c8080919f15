//! Judge reply parsing and score normalization.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::value_text;

#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("judge reply is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("judge reply is not a JSON object")]
    NotAnObject,
}

/// Score and explanation extracted from one reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub score: f64,
    pub explanation: String,
}

/// Parse a reply as a JSON object. When the whole text is not JSON, the span
/// from the first `{` to the last `}` gets one more try.
pub fn parse_reply(text: &str) -> Result<Map<String, Value>, ReplyError> {
    let value = match serde_json::from_str::<Value>(text) {
        Ok(v) => v,
        Err(direct) => embedded_object(text).ok_or(ReplyError::InvalidJson(direct))?,
    };
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ReplyError::NotAnObject),
    }
}

fn embedded_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// Collapse any score representation to exactly 0.0 or 1.0.
pub fn normalize_score(raw: Option<&Value>) -> f64 {
    let numeric = match raw {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    let truthy = match (numeric, raw) {
        (Some(x), _) => x >= 0.5,
        (None, Some(Value::String(s))) => matches!(s.trim(), "1" | "true" | "True"),
        (None, _) => false,
    };
    if truthy {
        1.0
    } else {
        0.0
    }
}

pub fn normalize_explanation(raw: Option<&Value>) -> String {
    raw.map(value_text).unwrap_or_default().trim().to_string()
}

pub fn verdict_from_reply(text: &str) -> Result<Verdict, ReplyError> {
    let data = parse_reply(text)?;
    Ok(Verdict {
        score: normalize_score(data.get("score")),
        explanation: normalize_explanation(data.get("explanation")),
    })
}
