//! Tool-call extraction from free-form model text.
//!
//! Recognizes one `<tool_call>{...}</tool_call>` span. Parsing is
//! total: every malformed input degrades to `None`, never an error.

use serde_json::{Map, Value};
use tracing::debug;

/// Opening marker of a tool-call span.
pub const TOOL_CALL_OPEN: &str = "<tool_call>";
/// Closing marker of a tool-call span.
pub const TOOL_CALL_CLOSE: &str = "</tool_call>";
/// Markers wrapping a tool result fed back to the model.
pub const TOOL_RESPONSE_OPEN: &str = "<tool_response>";
pub const TOOL_RESPONSE_CLOSE: &str = "</tool_response>";

/// A structured call extracted from model output.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    /// Tool name; never empty.
    pub name: String,
    /// Arguments, normalized to a mapping.
    pub arguments: Map<String, Value>,
}

/// Parse a tool call out of `text`.
///
/// Tolerance rules, in order: a missing closing marker is recovered by
/// brace-depth matching from the opening marker; single-quoted JSON is
/// retried with naive quote substitution; an `arguments` value that is
/// itself a JSON-encoded string is decoded one more level.
pub fn parse_tool_call(text: &str) -> Option<ToolCall> {
    let start = text.find(TOOL_CALL_OPEN)? + TOOL_CALL_OPEN.len();
    let after_open = &text[start..];

    let json_str = match after_open.find(TOOL_CALL_CLOSE) {
        Some(end) => after_open[..end].trim(),
        None => balanced_object_span(after_open.trim_start())?,
    };

    let value = decode_lenient(json_str)?;
    validate_call(value)
}

/// First balanced `{...}` span of `text`, for streams truncated before
/// the closing marker.
fn balanced_object_span(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut started = false;
    for (i, c) in text.char_indices() {
        match c {
            '{' => {
                depth += 1;
                started = true;
            }
            '}' => {
                if !started {
                    return None;
                }
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[..i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Strict JSON decode, then a best-effort retry with `'` → `"`.
///
/// The substitution is deliberately naive (not a JSON5 parser); it only
/// exists to recover models that emit single-quoted objects.
fn decode_lenient(json_str: &str) -> Option<Value> {
    if let Ok(v) = serde_json::from_str(json_str) {
        return Some(v);
    }
    serde_json::from_str(&json_str.replace('\'', "\"")).ok()
}

fn validate_call(value: Value) -> Option<ToolCall> {
    let Value::Object(mut call) = value else {
        return None;
    };

    let name = match call.get("name") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => return None,
    };

    let arguments = match call.remove("arguments")? {
        Value::Object(map) => map,
        // Nested-JSON fix: arguments encoded as a string.
        Value::String(s) => match serde_json::from_str(&s) {
            Ok(Value::Object(map)) => map,
            _ => {
                debug!("tool call '{name}' arguments string did not decode to a mapping");
                return None;
            }
        },
        _ => return None,
    };

    Some(ToolCall { name, arguments })
}
