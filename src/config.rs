//! Configuration types for the agent runtime.

use crate::providers::{GenerationOptions, VoiceOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Speech-to-text settings.
    pub asr: AsrConfig,
    /// Language-model settings.
    pub llm: LlmConfig,
    /// Speech synthesis / dispatch settings.
    pub speech: SpeechConfig,
    /// Tool-calling settings.
    pub tools: ToolsConfig,
}

/// Speech-to-text configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AsrConfig {
    /// Capture/transcription sample rate in Hz.
    pub sample_rate: u32,
    /// Language hint for the transcriber.
    pub language: String,
    /// Timeout for one whole-utterance transcription, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for AsrConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            language: "en".to_owned(),
            timeout_ms: 15_000,
        }
    }
}

/// Language-model configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Sampling temperature.
    pub temperature: f32,
    /// Sampling seed (None = provider default).
    pub seed: Option<u64>,
    /// Cap on generated tokens per round (None = uncapped).
    pub max_tokens: Option<usize>,
    /// Fraction of context capacity at which the context is cleared
    /// before the next turn, leaving room for the response.
    pub context_threshold: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            seed: Some(42),
            max_tokens: None,
            context_threshold: 0.80,
        }
    }
}

impl LlmConfig {
    /// Sampling options derived from this config.
    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            temperature: self.temperature,
            seed: self.seed,
            max_tokens: self.max_tokens,
        }
    }
}

/// Speech synthesis and dispatch configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Voice shaping options passed to the synthesizer.
    pub voice: VoiceOptions,
    /// Also split the first chunk of a turn on a comma, so speech
    /// starts before the first full sentence completes.
    pub eager_first_clause: bool,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            voice: VoiceOptions::default(),
            eager_first_clause: true,
        }
    }
}

/// Tool-calling configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Whether tool calls are recognized and executed.
    pub enabled: bool,
    /// Maximum consecutive tool rounds within one turn.
    pub max_rounds: u32,
    /// Directory for model context caches (None = no caching).
    pub cache_dir: Option<std::path::PathBuf>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_rounds: 2,
            cache_dir: None,
        }
    }
}

impl AgentConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::AgentError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::AgentError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
