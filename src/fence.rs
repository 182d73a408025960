//! Generation fence: monotonic turn id plus interrupt flag.
//!
//! Cancellation must be visible both to items already enqueued (the
//! speech worker skips stale audio by id comparison) and to the
//! token-consumption loop (which stops pulling when the flag is set).
//! A single flag plus an id gives both without touching queue contents.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Shared turn-identity and cancellation state.
#[derive(Debug, Default)]
pub struct GenerationFence {
    current: AtomicU64,
    interrupted: AtomicBool,
}

impl GenerationFence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new user-initiated turn: clears the interrupt flag and
    /// returns the new (strictly increasing) generation id.
    ///
    /// Tool rounds are continuations of the initiating turn and must
    /// not call this again.
    pub fn begin_turn(&self) -> u64 {
        self.interrupted.store(false, Ordering::SeqCst);
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Raise the interrupt flag. Idempotent.
    pub fn raise_interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    /// Consume a barge-in flag left over from the previous turn,
    /// without starting a new one. A flag raised after this call
    /// belongs to the turn now beginning.
    pub fn clear_interrupt(&self) {
        self.interrupted.store(false, Ordering::SeqCst);
    }

    /// The generation id of the current turn.
    pub fn current_id(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    /// Whether the current turn has been interrupted.
    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Whether work tagged with `id` is still current and uncancelled.
    pub fn admits(&self, id: u64) -> bool {
        !self.is_interrupted() && self.current_id() == id
    }
}
