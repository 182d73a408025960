//! Speech dispatch queue and synthesis worker.
//!
//! Sentences flushed during generation are queued here, tagged with the
//! generation id current when they were produced. A dedicated worker
//! thread consumes the queue for the lifetime of the dispatcher: stale
//! items are discarded at consumption time (interruption can land after
//! enqueue but before consumption, so enqueue-time filtering is not
//! enough), live items are synthesized and played with the playback
//! handle parked where an interrupt can terminate it.

use crate::fence::GenerationFence;
use crate::providers::{PlaybackHandle, SpeechSynthesizer, VoiceOptions};
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

/// One queued text segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechItem {
    /// Generation id current when the segment was produced.
    pub generation_id: u64,
    /// The text to speak.
    pub text: String,
}

#[derive(Default)]
struct QueueState {
    items: VecDeque<SpeechItem>,
    shutdown: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    available: Condvar,
    fence: Arc<GenerationFence>,
    /// Exclusively written by the worker; terminated by `interrupt`
    /// under the same lock so a handle is never killed mid-transition.
    active: Mutex<Option<Arc<dyn PlaybackHandle>>>,
}

/// Ordered speech queue plus its synthesis worker.
pub struct SpeechDispatcher {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl SpeechDispatcher {
    /// Start the dispatcher; the worker thread runs until [`shutdown`](Self::shutdown).
    pub fn new(
        synthesizer: Box<dyn SpeechSynthesizer>,
        voice: VoiceOptions,
        fence: Arc<GenerationFence>,
    ) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState::default()),
            available: Condvar::new(),
            fence,
            active: Mutex::new(None),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name("speech-worker".to_owned())
            .spawn(move || run_worker(worker_shared, synthesizer, voice))
            .ok();
        if worker.is_none() {
            warn!("failed to spawn speech worker; speech output disabled");
        }

        Self { shared, worker }
    }

    /// The fence shared with the rest of the pipeline.
    pub fn fence(&self) -> &Arc<GenerationFence> {
        &self.shared.fence
    }

    /// Start a new turn and return its generation id.
    pub fn begin_turn(&self) -> u64 {
        self.shared.fence.begin_turn()
    }

    /// Queue a text segment. Never blocks.
    pub fn enqueue(&self, generation_id: u64, text: impl Into<String>) {
        let mut state = lock_recover(&self.shared.state);
        if state.shutdown {
            return;
        }
        state.items.push_back(SpeechItem {
            generation_id,
            text: text.into(),
        });
        drop(state);
        self.shared.available.notify_one();
    }

    /// Hard stop: raise the interrupt flag, drop everything queued, and
    /// terminate playback in progress. Safe to call repeatedly.
    pub fn interrupt(&self) {
        self.shared.fence.raise_interrupt();
        self.drain();
        if let Some(handle) = lock_recover(&self.shared.active).as_ref() {
            handle.terminate();
        }
    }

    /// Drop all pending items immediately, regardless of id.
    pub fn drain(&self) {
        let dropped = {
            let mut state = lock_recover(&self.shared.state);
            let dropped = state.items.len();
            state.items.clear();
            dropped
        };
        if dropped > 0 {
            debug!("dropped {dropped} queued speech item(s)");
        }
    }

    /// Number of items waiting for the worker.
    pub fn pending(&self) -> usize {
        lock_recover(&self.shared.state).items.len()
    }

    /// Whether audio playback is currently in progress.
    pub fn is_speaking(&self) -> bool {
        lock_recover(&self.shared.active).is_some()
    }

    /// Stop the worker and terminate in-flight playback; blocks until
    /// the worker thread has exited.
    pub fn shutdown(&mut self) {
        {
            let mut state = lock_recover(&self.shared.state);
            if state.shutdown {
                return;
            }
            state.shutdown = true;
            state.items.clear();
        }
        self.shared.available.notify_all();
        if let Some(handle) = lock_recover(&self.shared.active).as_ref() {
            handle.terminate();
        }
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            warn!("speech worker panicked during shutdown");
        }
        info!("speech dispatcher stopped");
    }
}

impl Drop for SpeechDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(shared: Arc<Shared>, mut synth: Box<dyn SpeechSynthesizer>, voice: VoiceOptions) {
    loop {
        let item = {
            let mut state = lock_recover(&shared.state);
            loop {
                if state.shutdown {
                    return;
                }
                if let Some(item) = state.items.pop_front() {
                    break item;
                }
                state = match shared.available.wait(state) {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
            }
        };

        if !shared.fence.admits(item.generation_id) {
            debug!(
                "discarding stale speech item (generation {})",
                item.generation_id
            );
            continue;
        }

        let text = clean_for_synthesis(&item.text);
        if text.is_empty() {
            continue;
        }

        let audio = match synth.synthesize(&text, &voice) {
            Ok(audio) => audio,
            Err(e) => {
                warn!("speech synthesis failed, skipping segment: {e}");
                continue;
            }
        };

        // An interrupt may have landed while synthesis was running.
        if !shared.fence.admits(item.generation_id) {
            continue;
        }

        let handle: Arc<dyn PlaybackHandle> = match synth.play(audio) {
            Ok(handle) => Arc::from(handle),
            Err(e) => {
                warn!("audio playback failed, skipping segment: {e}");
                continue;
            }
        };

        *lock_recover(&shared.active) = Some(Arc::clone(&handle));
        // Close the window between starting playback and parking the
        // handle: an interrupt in that gap saw no active handle.
        if !shared.fence.admits(item.generation_id) {
            handle.terminate();
        }
        if let Err(e) = handle.wait() {
            warn!("playback ended with error: {e}");
        }
        *lock_recover(&shared.active) = None;
    }
}

fn lock_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Strip formatting and noisy symbols that cause synthesis artifacts.
///
/// Removes markdown emphasis/backticks, rewrites `[text](url)` links to
/// their text, spaces out symbol noise, and collapses whitespace.
pub fn clean_for_synthesis(text: &str) -> String {
    let text = strip_links(text);
    let mut filtered = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '*' | '_' | '`' => {}
            '~' | '@' | '^' | '|' | '\\' | '<' | '>' | '{' | '}' | '[' | ']' | '#' => {
                filtered.push(' ');
            }
            _ => filtered.push(c),
        }
    }
    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_links(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('[') {
        let Some(close_rel) = rest[open..].find(']') else {
            break;
        };
        let close = open + close_rel;
        let after = &rest[close + 1..];
        if let Some(stripped) = after.strip_prefix('(')
            && let Some(paren) = stripped.find(')')
        {
            out.push_str(&rest[..open]);
            out.push_str(&rest[open + 1..close]);
            rest = &stripped[paren + 1..];
        } else {
            out.push_str(&rest[..close + 1]);
            rest = after;
        }
    }
    out.push_str(rest);
    out
}
