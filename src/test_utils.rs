//! Shared test doubles used across unit test modules.

use crate::error::{AgentError, Result};
use crate::fence::GenerationFence;
use crate::providers::{
    AudioBuffer, GenerationOptions, LanguageModel, Message, PlaybackHandle, Recorder,
    SpeechSynthesizer, SpeechToText, TokenStream, TranscriptSegment, VoiceOptions,
};
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, OnceLock};
use std::time::{Duration, Instant};

/// Poll `cond` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}

/// Playback handle that completes immediately.
pub struct InstantHandle;

impl PlaybackHandle for InstantHandle {
    fn wait(&self) -> Result<()> {
        Ok(())
    }

    fn terminate(&self) {}
}

/// Playback handle that blocks until terminated.
pub struct BlockingHandle {
    finished: Mutex<bool>,
    signal: Condvar,
}

impl BlockingHandle {
    pub fn new() -> Self {
        Self {
            finished: Mutex::new(false),
            signal: Condvar::new(),
        }
    }
}

impl PlaybackHandle for BlockingHandle {
    fn wait(&self) -> Result<()> {
        let mut finished = self.finished.lock().expect("lock");
        while !*finished {
            finished = self.signal.wait(finished).expect("wait");
        }
        Ok(())
    }

    fn terminate(&self) {
        *self.finished.lock().expect("lock") = true;
        self.signal.notify_all();
    }
}

/// Synthesizer that records every synthesized text.
pub struct RecordingSynth {
    spoken: Arc<Mutex<Vec<String>>>,
    blocking_playback: bool,
    fail_pattern: Option<String>,
}

impl RecordingSynth {
    /// Playback completes immediately.
    pub fn instant() -> Self {
        Self {
            spoken: Arc::new(Mutex::new(Vec::new())),
            blocking_playback: false,
            fail_pattern: None,
        }
    }

    /// Playback blocks until terminated.
    pub fn blocking() -> Self {
        Self {
            blocking_playback: true,
            ..Self::instant()
        }
    }

    /// Fail synthesis for any text containing `pattern`.
    pub fn fail_on(mut self, pattern: &str) -> Self {
        self.fail_pattern = Some(pattern.to_owned());
        self
    }

    pub fn spoken(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.spoken)
    }
}

impl SpeechSynthesizer for RecordingSynth {
    fn synthesize(&mut self, text: &str, _voice: &VoiceOptions) -> Result<AudioBuffer> {
        if let Some(pattern) = &self.fail_pattern
            && text.contains(pattern)
        {
            return Err(AgentError::Synthesis(format!("forced failure on '{text}'")));
        }
        self.spoken.lock().expect("lock").push(text.to_owned());
        Ok(AudioBuffer {
            samples: vec![0.0; 160],
            sample_rate: 16_000,
        })
    }

    fn play(&mut self, _audio: AudioBuffer) -> Result<Box<dyn PlaybackHandle>> {
        if self.blocking_playback {
            Ok(Box::new(BlockingHandle::new()))
        } else {
            Ok(Box::new(InstantHandle))
        }
    }
}

/// Hook invoked with the running token index while a script plays out.
pub type TokenHook = Arc<dyn Fn(usize) + Send + Sync>;

/// Language model that replays scripted token sequences, one per
/// `generate` call, recording every prompt it receives.
pub struct ScriptedLm {
    scripts: VecDeque<Vec<String>>,
    prompts: Arc<Mutex<Vec<Vec<Message>>>>,
    hook: Option<TokenHook>,
    fail_after: Option<usize>,
    usage: usize,
    capacity: usize,
    token_index: usize,
}

impl ScriptedLm {
    pub fn new(scripts: &[&[&str]]) -> Self {
        Self {
            scripts: scripts
                .iter()
                .map(|s| s.iter().map(|t| (*t).to_owned()).collect())
                .collect(),
            prompts: Arc::new(Mutex::new(Vec::new())),
            hook: None,
            fail_after: None,
            usage: 0,
            capacity: 1_000,
            token_index: 0,
        }
    }

    /// Install a hook called once per produced token (global index).
    pub fn with_hook(mut self, hook: TokenHook) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Fail the stream after producing `n` tokens in total.
    pub fn fail_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn set_usage(&mut self, usage: usize) {
        self.usage = usage;
    }

    pub fn prompts(&self) -> Arc<Mutex<Vec<Vec<Message>>>> {
        Arc::clone(&self.prompts)
    }
}

impl LanguageModel for ScriptedLm {
    fn generate<'a>(
        &'a mut self,
        prompt: &[Message],
        _options: &GenerationOptions,
    ) -> Result<Box<dyn TokenStream + 'a>> {
        self.prompts.lock().expect("lock").push(prompt.to_vec());
        self.usage += 10;
        let tokens = self.scripts.pop_front().unwrap_or_default();
        Ok(Box::new(ScriptedStream {
            tokens: tokens.into(),
            hook: self.hook.clone(),
            fail_after: self.fail_after,
            index: &mut self.token_index,
            cancelled: false,
        }))
    }

    fn max_context_capacity(&self) -> usize {
        self.capacity
    }

    fn context_usage(&self) -> usize {
        self.usage
    }

    fn clear_context(&mut self) -> Result<()> {
        self.usage = 0;
        Ok(())
    }

    fn save_context(&self) -> Result<Vec<u8>> {
        Ok(self.usage.to_le_bytes().to_vec())
    }

    fn load_context(&mut self, blob: &[u8]) -> Result<()> {
        let bytes: [u8; 8] = blob
            .try_into()
            .map_err(|_| AgentError::Context("bad blob".to_owned()))?;
        self.usage = usize::from_le_bytes(bytes);
        Ok(())
    }
}

struct ScriptedStream<'a> {
    tokens: VecDeque<String>,
    hook: Option<TokenHook>,
    fail_after: Option<usize>,
    index: &'a mut usize,
    cancelled: bool,
}

impl TokenStream for ScriptedStream<'_> {
    fn next_token(&mut self) -> Result<Option<String>> {
        if self.cancelled {
            return Ok(None);
        }
        if let Some(limit) = self.fail_after
            && *self.index >= limit
        {
            return Err(AgentError::Generation("stream died".to_owned()));
        }
        let Some(token) = self.tokens.pop_front() else {
            return Ok(None);
        };
        if let Some(hook) = &self.hook {
            hook(*self.index);
        }
        *self.index += 1;
        Ok(Some(token))
    }

    fn cancel(&mut self) {
        self.cancelled = true;
    }
}

/// ASR double returning a fixed transcript (or a timeout fault).
pub struct FixedAsr {
    pub text: String,
    pub time_out: bool,
}

impl FixedAsr {
    pub fn transcript(text: &str) -> Self {
        Self {
            text: text.to_owned(),
            time_out: false,
        }
    }

    pub fn timing_out() -> Self {
        Self {
            text: String::new(),
            time_out: true,
        }
    }
}

impl SpeechToText for FixedAsr {
    fn transcribe(&mut self, _samples: &[f32], timeout: Duration) -> Result<Vec<TranscriptSegment>> {
        if self.time_out {
            return Err(AgentError::TranscriptionTimeout(timeout));
        }
        if self.text.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![TranscriptSegment {
            text: self.text.clone(),
            end_sec: 1.0,
        }])
    }
}

/// ASR double that raises the fence interrupt while transcription is
/// running. The fence is installed into the cell after the owning
/// controller has been constructed.
pub struct BargeInAsr {
    fence: Arc<OnceLock<Arc<GenerationFence>>>,
    text: String,
}

impl BargeInAsr {
    pub fn new(text: &str) -> (Self, Arc<OnceLock<Arc<GenerationFence>>>) {
        let cell = Arc::new(OnceLock::new());
        let asr = Self {
            fence: Arc::clone(&cell),
            text: text.to_owned(),
        };
        (asr, cell)
    }
}

impl SpeechToText for BargeInAsr {
    fn transcribe(&mut self, _samples: &[f32], _timeout: Duration) -> Result<Vec<TranscriptSegment>> {
        if let Some(fence) = self.fence.get() {
            fence.raise_interrupt();
        }
        Ok(vec![TranscriptSegment {
            text: self.text.clone(),
            end_sec: 1.0,
        }])
    }
}

/// Recorder double that yields a fixed sample buffer on stop.
pub struct ScriptedRecorder {
    samples: Vec<f32>,
}

impl ScriptedRecorder {
    pub fn with_samples(samples: Vec<f32>) -> Self {
        Self { samples }
    }
}

impl Recorder for ScriptedRecorder {
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> Result<Vec<f32>> {
        Ok(std::mem::take(&mut self.samples))
    }

    fn close(&mut self) {}
}
