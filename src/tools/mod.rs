//! Tool-call parsing, registry, and execution.
//!
//! A tool call is recognized in model output (`parse`), resolved
//! against an explicit registry built at startup (`registry`), and run
//! with every failure converted to a structured result the model can
//! react to (`execute`).

pub mod execute;
pub mod parse;
pub mod registry;

pub use execute::{execute_tool_call, execute_tool_value};
pub use parse::{
    TOOL_CALL_CLOSE, TOOL_CALL_OPEN, TOOL_RESPONSE_CLOSE, TOOL_RESPONSE_OPEN, ToolCall,
    parse_tool_call,
};
pub use registry::{ToolEntry, ToolInitializer, ToolRegistry, ToolRunner};
