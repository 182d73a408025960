//! Turn controller: drives one utterance end to end.
//!
//! A turn runs transcription, prompt assembly, streaming generation
//! with sentence-level speech dispatch, and any tool rounds the model
//! requests, all under one generation id. `interrupt` cuts the whole
//! turn: the token loop observes the flag after every append, queued
//! speech is drained, and in-flight playback is terminated.

use crate::config::AgentConfig;
use crate::context;
use crate::error::AgentError;
use crate::fence::GenerationFence;
use crate::prompt::system_prompt;
use crate::providers::{LanguageModel, Message, SpeechSynthesizer, SpeechToText, TokenStream};
use crate::segment::StreamSegmenter;
use crate::speech::SpeechDispatcher;
use crate::tools::{
    TOOL_CALL_OPEN, TOOL_RESPONSE_CLOSE, TOOL_RESPONSE_OPEN, ToolCall, ToolRegistry,
    execute_tool_call, parse_tool_call,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One tool execution performed during a turn, kept so the host can
/// surface results (and failures) alongside the spoken response.
#[derive(Debug, Clone)]
pub struct ToolEvent {
    /// Tool name as called.
    pub name: String,
    /// The structured result mapping fed back to the model.
    pub result: Map<String, Value>,
}

impl ToolEvent {
    pub fn succeeded(&self) -> bool {
        self.result
            .get("ok")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Display line for a failed execution, `None` on success.
    pub fn error_line(&self) -> Option<String> {
        if self.succeeded() {
            return None;
        }
        let message = self
            .result
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        Some(format!("[Tool Error] {message}"))
    }
}

/// Terminal state of one turn.
#[derive(Debug)]
pub enum TurnOutcome {
    /// The turn ran to completion.
    Completed {
        /// What the user said (or typed).
        transcript: String,
        /// The full spoken response, tool spans excluded.
        response: String,
        /// Tool executions performed during the turn, in order.
        tool_events: Vec<ToolEvent>,
    },
    /// Nothing usable was transcribed; no generation was attempted.
    Empty,
    /// The turn was cut short by `interrupt`.
    Interrupted,
    /// A capability fault ended the turn early. The pipeline stays
    /// usable for the next turn.
    Failed {
        /// Text accumulated before the fault.
        partial: String,
        error: AgentError,
    },
}

/// How one streaming round ended.
enum RoundEnd {
    Finished,
    Interrupted,
    /// A completed tool-call span was detected; the payload carries the
    /// byte offset of the opening marker in the round text.
    ToolCall(ToolCall, usize),
    Faulted(AgentError),
}

/// Owns the capability providers and coordinates a turn at a time.
pub struct TurnController {
    asr: Box<dyn SpeechToText>,
    llm: Box<dyn LanguageModel>,
    dispatcher: SpeechDispatcher,
    registry: ToolRegistry,
    config: AgentConfig,
    need_preamble: bool,
}

impl TurnController {
    pub fn new(
        asr: Box<dyn SpeechToText>,
        llm: Box<dyn LanguageModel>,
        synthesizer: Box<dyn SpeechSynthesizer>,
        registry: ToolRegistry,
        config: AgentConfig,
    ) -> Self {
        let fence = Arc::new(GenerationFence::new());
        let dispatcher =
            SpeechDispatcher::new(synthesizer, config.speech.voice.clone(), fence);
        Self {
            asr,
            llm,
            dispatcher,
            registry,
            config,
            need_preamble: true,
        }
    }

    /// The speech dispatcher driving this controller's audio output.
    pub fn dispatcher(&self) -> &SpeechDispatcher {
        &self.dispatcher
    }

    /// Cancel whatever turn is in flight. Safe from any thread, safe to
    /// repeat.
    pub fn interrupt(&self) {
        self.dispatcher.interrupt();
    }

    /// Run one voice turn from captured samples.
    pub fn process_utterance(&mut self, samples: &[f32]) -> TurnOutcome {
        // A barge-in raised against the previous turn has done its
        // work by the time new samples arrive; from here the flag
        // cancels this turn.
        self.dispatcher.fence().clear_interrupt();

        let timeout = Duration::from_millis(self.config.asr.timeout_ms);
        let segments = match self.asr.transcribe(samples, timeout) {
            Ok(segments) => segments,
            Err(e) => {
                warn!("transcription failed: {e}");
                return TurnOutcome::Failed {
                    partial: String::new(),
                    error: e,
                };
            }
        };

        if self.dispatcher.fence().is_interrupted() {
            info!("interrupted while transcribing");
            return TurnOutcome::Interrupted;
        }

        let transcript = segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if transcript.is_empty() {
            info!("empty transcript, skipping turn");
            return TurnOutcome::Empty;
        }
        info!(%transcript, "transcribed utterance");
        self.process_text(&transcript)
    }

    /// Run one turn from already-transcribed (or typed) text.
    pub fn process_text(&mut self, user_text: &str) -> TurnOutcome {
        if context::check_and_trim(self.llm.as_mut(), self.config.llm.context_threshold) {
            self.need_preamble = true;
        }

        let tools_active = self.config.tools.enabled && !self.registry.is_empty();
        let mut prompt = Vec::new();
        if tools_active && self.need_preamble {
            prompt.push(Message::system(system_prompt(&self.registry)));
        }
        prompt.push(Message::user(user_text));

        let generation_id = self.dispatcher.begin_turn();
        let options = self.config.llm.generation_options();
        let mut segmenter = StreamSegmenter::new(self.config.speech.eager_first_clause);
        let mut response = String::new();
        let mut tool_events = Vec::new();
        let mut tool_rounds: u32 = 0;

        loop {
            debug!(generation_id, round = tool_rounds, "opening generation round");
            let mut stream = match self.llm.generate(&prompt, &options) {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("generation failed to start: {e}");
                    return TurnOutcome::Failed {
                        partial: response,
                        error: e,
                    };
                }
            };
            let mut round_text = String::new();
            let end = drive_round(
                stream.as_mut(),
                &self.dispatcher,
                &mut segmenter,
                generation_id,
                tools_active,
                &mut round_text,
            );
            drop(stream);
            self.need_preamble = false;

            match end {
                RoundEnd::Interrupted => {
                    info!(generation_id, "turn interrupted");
                    return TurnOutcome::Interrupted;
                }
                RoundEnd::Faulted(e) => {
                    warn!("generation stream failed: {e}");
                    response.push_str(&round_text);
                    return TurnOutcome::Failed {
                        partial: response,
                        error: e,
                    };
                }
                RoundEnd::Finished => {
                    response.push_str(&round_text);
                    if let Some(rest) = segmenter.take_remainder() {
                        self.dispatcher.enqueue(generation_id, rest);
                    }
                    break;
                }
                RoundEnd::ToolCall(call, marker) => {
                    response.push_str(&round_text[..marker]);
                    if let Some(rest) = segmenter.take_remainder() {
                        self.dispatcher.enqueue(generation_id, rest);
                    }
                    if tool_rounds >= self.config.tools.max_rounds {
                        warn!(
                            limit = self.config.tools.max_rounds,
                            "tool round limit reached, finishing with accumulated text"
                        );
                        break;
                    }
                    tool_rounds += 1;

                    info!(tool = %call.name, round = tool_rounds, "executing tool call");
                    let result = execute_tool_call(&call, &self.registry);
                    let payload = Value::Object(result.clone()).to_string();
                    debug!(tool = %call.name, %payload, "tool result");
                    tool_events.push(ToolEvent {
                        name: call.name.clone(),
                        result,
                    });

                    prompt = vec![Message::user(format!(
                        "{TOOL_RESPONSE_OPEN}{payload}{TOOL_RESPONSE_CLOSE}"
                    ))];
                    segmenter.continue_round();
                }
            }
        }

        let response = response.trim().to_owned();
        info!(generation_id, chars = response.len(), "turn complete");
        TurnOutcome::Completed {
            transcript: user_text.to_owned(),
            response,
            tool_events,
        }
    }

    /// Clear the model context and re-arm the system preamble.
    pub fn reset_context(&mut self) {
        match self.llm.clear_context() {
            Ok(()) => info!("conversation context cleared"),
            Err(e) => warn!("failed to clear context: {e}"),
        }
        self.need_preamble = true;
    }

    /// Save the model context to the configured cache directory.
    /// Returns false (logged) when caching is unconfigured or fails.
    pub fn persist_context(&self, key: &str) -> bool {
        match &self.config.tools.cache_dir {
            Some(dir) => context::save_to_cache(self.llm.as_ref(), key, dir),
            None => false,
        }
    }

    /// Restore the model context from the configured cache directory.
    /// A successful restore means the preamble is already in context.
    pub fn restore_context(&mut self, key: &str) -> bool {
        let Some(dir) = self.config.tools.cache_dir.clone() else {
            return false;
        };
        let loaded = context::load_from_cache(self.llm.as_mut(), key, &dir);
        if loaded {
            self.need_preamble = false;
        }
        loaded
    }

    /// Stop the speech worker; blocks until it has exited.
    pub fn shutdown(&mut self) {
        self.dispatcher.shutdown();
    }
}

/// Pull tokens until the round ends, feeding completed sentences to the
/// dispatcher as they form.
///
/// The interrupt check sits between appending a token and flushing the
/// sentences it completes, so nothing produced after the flag was
/// observed reaches the queue. Tool detection scans only this round's
/// text; a call echoed back via an earlier round's tool response is
/// never re-detected.
fn drive_round(
    stream: &mut dyn TokenStream,
    dispatcher: &SpeechDispatcher,
    segmenter: &mut StreamSegmenter,
    generation_id: u64,
    detect_tools: bool,
    round_text: &mut String,
) -> RoundEnd {
    loop {
        let token = match stream.next_token() {
            Ok(Some(token)) => token,
            Ok(None) => return RoundEnd::Finished,
            Err(e) => return RoundEnd::Faulted(e),
        };
        round_text.push_str(&token);

        if dispatcher.fence().is_interrupted() {
            stream.cancel();
            return RoundEnd::Interrupted;
        }

        for sentence in segmenter.push(&token) {
            dispatcher.enqueue(generation_id, sentence);
        }

        if detect_tools
            && let Some(call) = parse_tool_call(round_text)
        {
            // Remaining tokens of this round are the model narrating
            // past its own call; discard them.
            stream.cancel();
            let marker = round_text.find(TOOL_CALL_OPEN).unwrap_or(round_text.len());
            return RoundEnd::ToolCall(call, marker);
        }
    }
}
