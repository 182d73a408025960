//! Tool execution against the registry.
//!
//! Every failure mode is converted to a structured `{ok: false, error}`
//! mapping that is fed back to the model; a faulty tool never aborts
//! the turn.

use super::parse::ToolCall;
use super::registry::ToolRegistry;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

/// Execute a parsed call, returning a result mapping with at least
/// `{ok: bool}`.
pub fn execute_tool_call(call: &ToolCall, registry: &ToolRegistry) -> Map<String, Value> {
    info!("tool call: {}", call.name);
    // Bound outside the macro: a bare `Value` path inside `debug!`
    // resolves against the `tracing::Value` trait.
    let arguments = Value::Object(call.arguments.clone());
    debug!("tool call arguments: {arguments}");

    let Some(entry) = registry.get(&call.name) else {
        let available = registry.names().join(", ");
        return failure(format!(
            "Unknown tool '{}'. Available: {available}",
            call.name
        ));
    };

    let Some(runner) = entry.runner() else {
        return failure(format!("{} is missing an executable runner.", call.name));
    };

    // First execution for this entry runs the initializer, if any.
    // Initialization faults are logged and do not block the attempt.
    if let Some(init) = entry.take_initialization()
        && let Err(e) = init()
    {
        warn!("tool '{}' initialization failed: {e}", call.name);
    }

    match runner(&call.arguments) {
        Ok(Value::Object(result)) => {
            let rendered = Value::Object(result.clone());
            debug!("tool result: {rendered}");
            result
        }
        Ok(other) => failure(format!(
            "{} returned invalid format: expected mapping, got {}",
            call.name,
            json_kind(&other)
        )),
        Err(e) => failure(format!("{} execution failed: {e}", call.name)),
    }
}

/// Execute a call supplied as raw JSON, validating its shape first.
/// Used at trust boundaries where the call did not come from the
/// in-crate parser.
pub fn execute_tool_value(call: &Value, registry: &ToolRegistry) -> Map<String, Value> {
    let Value::Object(obj) = call else {
        return failure(format!(
            "Invalid tool call format: expected mapping, got {}",
            json_kind(call)
        ));
    };

    let name = obj.get("name").and_then(Value::as_str).unwrap_or_default();
    if name.is_empty() {
        return failure("Invalid tool call format: missing tool name".to_owned());
    }
    let arguments = match obj.get("arguments") {
        Some(Value::Object(map)) => map.clone(),
        _ => {
            return failure(format!(
                "Invalid tool call format: arguments must be a mapping for tool '{name}'"
            ));
        }
    };

    execute_tool_call(
        &ToolCall {
            name: name.to_owned(),
            arguments,
        },
        registry,
    )
}

fn failure(error: String) -> Map<String, Value> {
    warn!("tool execution failed: {error}");
    let mut result = Map::new();
    result.insert("ok".to_owned(), json!(false));
    result.insert("error".to_owned(), json!(error));
    result
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "mapping",
    }
}
