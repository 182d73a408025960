//! Recorder-driven interactive session.
//!
//! Push-to-talk front end over the turn controller: one toggle starts
//! capture (cutting off any response still playing), the next toggle
//! stops it and runs the utterance through the pipeline.

use crate::providers::Recorder;
use crate::turn::{TurnController, TurnOutcome};
use tracing::{info, warn};

/// An interactive voice session over a recorder and a turn controller.
pub struct VoiceSession {
    recorder: Box<dyn Recorder>,
    controller: TurnController,
    recording: bool,
}

impl VoiceSession {
    pub fn new(recorder: Box<dyn Recorder>, controller: TurnController) -> Self {
        Self {
            recorder,
            controller,
            recording: false,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn controller(&self) -> &TurnController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut TurnController {
        &mut self.controller
    }

    /// Start or stop capture. Starting interrupts any turn still in
    /// flight (barge-in); stopping runs the captured utterance through
    /// the controller and returns its outcome.
    pub fn toggle_recording(&mut self) -> Option<TurnOutcome> {
        if self.recording {
            self.stop_and_process()
        } else {
            self.start_capture();
            None
        }
    }

    fn start_capture(&mut self) {
        self.controller.interrupt();
        if let Err(e) = self.recorder.start() {
            warn!("failed to start recording: {e}");
            return;
        }
        self.recording = true;
        info!("recording started");
    }

    fn stop_and_process(&mut self) -> Option<TurnOutcome> {
        let samples = match self.recorder.stop() {
            Ok(samples) => samples,
            Err(e) => {
                warn!("failed to stop recording: {e}");
                self.recording = false;
                return None;
            }
        };
        self.recording = false;
        info!(samples = samples.len(), "recording stopped");
        if samples.is_empty() {
            return Some(TurnOutcome::Empty);
        }
        Some(self.controller.process_utterance(&samples))
    }

    /// Clear the model context and re-arm the tool preamble.
    pub fn reset_context(&mut self) {
        self.controller.reset_context();
    }

    /// Stop capture and shut the pipeline down; blocks until the speech
    /// worker has exited.
    pub fn close(&mut self) {
        if self.recording {
            self.recording = false;
            if let Err(e) = self.recorder.stop() {
                warn!("failed to stop recording during close: {e}");
            }
        }
        self.recorder.close();
        self.controller.interrupt();
        self.controller.shutdown();
        info!("session closed");
    }
}
