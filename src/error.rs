//! Error types for the lark runtime.

use std::time::Duration;

/// Top-level error type for the conversational agent runtime.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Speech-to-text transcription error.
    #[error("transcription error: {0}")]
    Transcription(String),

    /// The ASR capability exceeded the caller-supplied timeout.
    #[error("transcription timed out after {0:?}")]
    TranscriptionTimeout(Duration),

    /// Language-model stream failure.
    #[error("generation error: {0}")]
    Generation(String),

    /// Speech synthesis or playback error.
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Conversation-context save/load/trim error.
    #[error("context error: {0}")]
    Context(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AgentError>;
