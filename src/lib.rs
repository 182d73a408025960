//! Lark: interruptible streaming voice-agent runtime.
//!
//! Coordinates a spoken conversation turn end to end:
//! Utterance → STT → streaming LLM → sentence segmentation → TTS
//!
//! # Architecture
//!
//! The runtime is the coordination layer between opaque capability
//! providers (see [`providers`]):
//! - **Turn controller**: drives transcription, prompt assembly, the
//!   token loop, and tool rounds for one turn at a time
//! - **Generation fence**: one atomic id + interrupt flag shared by
//!   every stage; stale work is discarded wherever it surfaces
//! - **Speech dispatcher**: ordered queue plus a worker thread that
//!   synthesizes and plays sentences as they complete, so speech starts
//!   while the model is still generating
//! - **Tools**: in-band `<tool_call>` detection in the token stream,
//!   registry lookup, execution, and `<tool_response>` feedback rounds
//!
//! Barge-in is the defining behavior: `interrupt()` makes the token
//! loop stop, drops every queued sentence, and kills audio mid-word,
//! leaving the pipeline ready for the next turn.

pub mod config;
pub mod context;
pub mod error;
pub mod fence;
pub mod prompt;
pub mod providers;
pub mod segment;
pub mod session;
pub mod speech;
pub mod tools;
pub mod turn;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::AgentConfig;
pub use error::{AgentError, Result};
pub use fence::GenerationFence;
pub use session::VoiceSession;
pub use speech::SpeechDispatcher;
pub use tools::{ToolCall, ToolEntry, ToolRegistry};
pub use turn::{ToolEvent, TurnController, TurnOutcome};
