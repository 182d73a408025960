//! System prompt construction.
//!
//! The preamble teaches the model how to request tool execution, not
//! which tool to pick; each tool's own description carries that.

use crate::tools::ToolRegistry;

const BASE_PROMPT: &str = "You are a helpful voice assistant. Keep answers concise and conversational.";

/// Build the system prompt for a session.
///
/// With an empty registry this is just the base prompt; otherwise the
/// tool definitions and the call protocol are appended.
pub fn system_prompt(registry: &ToolRegistry) -> String {
    if registry.is_empty() {
        return BASE_PROMPT.to_owned();
    }

    let definitions = registry.definitions();
    let tools_json = serde_json::to_string(&definitions).unwrap_or_else(|_| "[]".to_owned());
    let names = registry
        .names()
        .iter()
        .map(|n| format!("\"{n}\""))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"{BASE_PROMPT}

# Available Tools
<tools>
{tools_json}
</tools>

Available tools: {names}

# Your Role vs Tool Role
- YOU are the assistant: you CALL tools, you do not respond as tools
- YOU output <tool_call> tags to request tool execution
- The system executes the tool and sends you <tool_response> tags
- NEVER output <tool_response> tags yourself
- Only output <tool_call> tags when you want to use a tool

# Tool Usage Rules
- If a tool can handle the request, call it using <tool_call>
- Only these tools exist: {names}. Never invent tools with other names
- Skip tools only for greetings, small talk, or requests with no tool match

# How to Call a Tool
When you need a tool, output exactly this format:
<tool_call>
{{"name": "<function-name>", "arguments": <args-json-object>}}
</tool_call>

Rules:
- Use double quotes (") in JSON, not single quotes
- Arguments must be a JSON object, not a string
- After calling, wait for the system to send you <tool_response>
"#
    )
}
