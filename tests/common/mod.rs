//! Mock capability providers shared by the integration tests.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use lark::Result;
use lark::error::AgentError;
use lark::providers::{
    AudioBuffer, GenerationOptions, LanguageModel, Message, PlaybackHandle, SpeechSynthesizer,
    SpeechToText, TokenStream, TranscriptSegment, VoiceOptions,
};
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// Install a test-writer subscriber once; `RUST_LOG` overrides.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

/// Poll `cond` until it holds or `timeout` elapses.
pub fn wait_for(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}

/// Transcribes every utterance to a fixed string.
pub struct MockAsr(pub String);

impl SpeechToText for MockAsr {
    fn transcribe(&mut self, _samples: &[f32], _timeout: Duration) -> Result<Vec<TranscriptSegment>> {
        Ok(vec![TranscriptSegment {
            text: self.0.clone(),
            end_sec: 1.0,
        }])
    }
}

/// Callback fired as each token is produced; receives the global token
/// index across all rounds of the model's lifetime.
pub type TokenCallback = Arc<dyn Fn(usize) + Send + Sync>;

/// Replays one scripted token sequence per `generate` call and records
/// every prompt it was given.
pub struct MockLm {
    scripts: VecDeque<Vec<String>>,
    prompts: Arc<Mutex<Vec<Vec<Message>>>>,
    callback: Option<TokenCallback>,
    produced: usize,
    context_blob: Vec<u8>,
    usage: usize,
}

impl MockLm {
    pub fn new(scripts: &[&[&str]]) -> Self {
        Self {
            scripts: scripts
                .iter()
                .map(|s| s.iter().map(|t| (*t).to_owned()).collect())
                .collect(),
            prompts: Arc::new(Mutex::new(Vec::new())),
            callback: None,
            produced: 0,
            context_blob: Vec::new(),
            usage: 0,
        }
    }

    pub fn on_token(mut self, callback: TokenCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn prompts(&self) -> Arc<Mutex<Vec<Vec<Message>>>> {
        Arc::clone(&self.prompts)
    }
}

impl LanguageModel for MockLm {
    fn generate<'a>(
        &'a mut self,
        prompt: &[Message],
        _options: &GenerationOptions,
    ) -> Result<Box<dyn TokenStream + 'a>> {
        self.prompts.lock().expect("lock").push(prompt.to_vec());
        self.usage += 10;
        let tokens = self.scripts.pop_front().unwrap_or_default();
        Ok(Box::new(MockStream {
            tokens: tokens.into(),
            callback: self.callback.clone(),
            produced: &mut self.produced,
            cancelled: false,
        }))
    }

    fn max_context_capacity(&self) -> usize {
        100_000
    }

    fn context_usage(&self) -> usize {
        self.usage
    }

    fn clear_context(&mut self) -> Result<()> {
        self.usage = 0;
        Ok(())
    }

    fn save_context(&self) -> Result<Vec<u8>> {
        Ok(self.context_blob.clone())
    }

    fn load_context(&mut self, blob: &[u8]) -> Result<()> {
        self.context_blob = blob.to_vec();
        Ok(())
    }
}

struct MockStream<'a> {
    tokens: VecDeque<String>,
    callback: Option<TokenCallback>,
    produced: &'a mut usize,
    cancelled: bool,
}

impl TokenStream for MockStream<'_> {
    fn next_token(&mut self) -> Result<Option<String>> {
        if self.cancelled {
            return Ok(None);
        }
        let Some(token) = self.tokens.pop_front() else {
            return Ok(None);
        };
        if let Some(callback) = &self.callback {
            callback(*self.produced);
        }
        *self.produced += 1;
        Ok(Some(token))
    }

    fn cancel(&mut self) {
        self.cancelled = true;
    }
}

/// Records synthesized texts; playback completes immediately unless
/// `blocking` is set, in which case it blocks until terminated.
pub struct MockSynth {
    spoken: Arc<Mutex<Vec<String>>>,
    blocking: bool,
    fail_pattern: Option<String>,
}

impl MockSynth {
    pub fn new() -> Self {
        Self {
            spoken: Arc::new(Mutex::new(Vec::new())),
            blocking: false,
            fail_pattern: None,
        }
    }

    pub fn blocking() -> Self {
        Self {
            blocking: true,
            ..Self::new()
        }
    }

    #[allow(dead_code)]
    pub fn fail_on(mut self, pattern: &str) -> Self {
        self.fail_pattern = Some(pattern.to_owned());
        self
    }

    pub fn spoken(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.spoken)
    }
}

impl SpeechSynthesizer for MockSynth {
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
        if self.blocking {
            Ok(Box::new(GatedPlayback {
                finished: Mutex::new(false),
                signal: Condvar::new(),
            }))
        } else {
            Ok(Box::new(InstantPlayback))
        }
    }
}

struct InstantPlayback;

impl PlaybackHandle for InstantPlayback {
    fn wait(&self) -> Result<()> {
        Ok(())
    }

    fn terminate(&self) {}
}

struct GatedPlayback {
    finished: Mutex<bool>,
    signal: Condvar,
}

impl PlaybackHandle for GatedPlayback {
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
