//! Capability provider traits consumed by the runtime.
//!
//! The runtime coordinates opaque ASR, language-model, and
//! speech-synthesis engines; hosts supply implementations of these
//! traits. None of the concrete engines live in this crate.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Role of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One message in a prompt or conversation context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }

    pub fn tool(text: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            text: text.into(),
        }
    }
}

/// Sampling options for one streaming generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Sampling temperature.
    pub temperature: f32,
    /// Sampling seed (None = provider default).
    pub seed: Option<u64>,
    /// Cap on generated tokens (None = run to the model's natural stop).
    pub max_tokens: Option<usize>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            seed: None,
            max_tokens: None,
        }
    }
}

/// One transcribed span of the input utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Transcribed text for this span.
    pub text: String,
    /// End of the span in seconds from utterance start.
    pub end_sec: f32,
}

/// Synthesized audio ready for playback.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Mono f32 samples.
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

/// Voice shaping options passed to the synthesizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceOptions {
    /// Output volume, 1.0 = unmodified.
    pub volume: f32,
    /// Speaking rate, 1.0 = the voice's natural pace.
    pub speaking_rate: f32,
}

impl Default for VoiceOptions {
    fn default() -> Self {
        Self {
            volume: 1.0,
            speaking_rate: 1.0,
        }
    }
}

/// Whole-utterance speech-to-text capability.
///
/// Implementations accept mono f32 samples at the configured sample
/// rate and must respect the caller-supplied timeout, reporting
/// [`AgentError::TranscriptionTimeout`](crate::error::AgentError) when
/// it is exceeded.
pub trait SpeechToText: Send {
    fn transcribe(&mut self, samples: &[f32], timeout: Duration) -> Result<Vec<TranscriptSegment>>;
}

/// Lazy, finite token stream for one generation round.
///
/// The consumer may stop early by calling [`cancel`](Self::cancel);
/// providers check the cancellation between token productions and
/// release underlying resources promptly.
pub trait TokenStream {
    /// Pull the next text fragment; `Ok(None)` marks end of stream.
    fn next_token(&mut self) -> Result<Option<String>>;

    /// Signal the provider to stop supplying tokens.
    fn cancel(&mut self);
}

/// Streaming language-model capability with provider-held context.
///
/// The conversation context lives inside the provider and is mutated
/// only by appending (each `generate` call extends it); it can be
/// round-tripped through opaque blobs for warm starts.
pub trait LanguageModel: Send {
    /// Open a streaming generation for the given prompt messages.
    fn generate<'a>(
        &'a mut self,
        prompt: &[Message],
        options: &GenerationOptions,
    ) -> Result<Box<dyn TokenStream + 'a>>;

    /// Maximum context capacity in tokens.
    fn max_context_capacity(&self) -> usize;

    /// Current context usage in tokens.
    fn context_usage(&self) -> usize;

    /// Discard the conversation context.
    fn clear_context(&mut self) -> Result<()>;

    /// Serialize the context to an opaque blob.
    fn save_context(&self) -> Result<Vec<u8>>;

    /// Restore a context previously produced by [`save_context`](Self::save_context).
    fn load_context(&mut self, blob: &[u8]) -> Result<()>;
}

/// Handle to audio playback in progress.
///
/// Held by the speech worker while audio is playing; the fence may
/// request termination from another thread, so both methods take
/// `&self`.
pub trait PlaybackHandle: Send + Sync {
    /// Block until playback completes naturally or is terminated.
    fn wait(&self) -> Result<()>;

    /// Stop playback as soon as possible. Idempotent.
    fn terminate(&self);
}

/// Speech-synthesis capability.
pub trait SpeechSynthesizer: Send {
    /// Synthesize an audio buffer for the given text.
    fn synthesize(&mut self, text: &str, voice: &VoiceOptions) -> Result<AudioBuffer>;

    /// Start playback of a synthesized buffer, returning its handle.
    fn play(&mut self, audio: AudioBuffer) -> Result<Box<dyn PlaybackHandle>>;
}

/// Per-buffer capture callback, invoked while the recorder is active.
pub type FrameSink = Box<dyn FnMut(&[f32]) + Send>;

/// Push-based microphone capture.
pub trait Recorder: Send {
    /// Begin capturing audio.
    fn start(&mut self) -> Result<()>;

    /// Stop capturing and return the recorded samples (possibly empty).
    fn stop(&mut self) -> Result<Vec<f32>>;

    /// Install or remove a per-buffer frame callback.
    fn set_frame_sink(&mut self, _sink: Option<FrameSink>) {}

    /// Release capture resources.
    fn close(&mut self);
}
