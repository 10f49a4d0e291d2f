//! Incremental text reveal.
//!
//! The engine itself owns no timer. Whoever drives it calls [`TypewriterEngine::tick`]
//! at the nominal rate and stops calling once the engine reports it has caught
//! up; growth of the target resumes the ticking.

use crate::error::SessionError;

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The engine was cancelled; nothing changed.
    Cancelled,
    /// More of the target became visible.
    Advanced,
    /// Everything known so far is visible but more text may still arrive.
    CaughtUp,
    /// The sealed target is fully visible. Reported exactly once.
    Completed,
}

/// Reveals a growing target string a few characters at a time.
///
/// The revealed prefix never shrinks and never runs past the target, and
/// growing the target keeps the current position.
#[derive(Debug, Clone)]
pub struct TypewriterEngine {
    generation: u32,
    target: String,
    /// Byte length of the revealed prefix, always on a char boundary.
    revealed: usize,
    chars_per_tick: usize,
    sealed: bool,
    cancelled: bool,
    completed: bool,
}

impl TypewriterEngine {
    pub fn new(generation: u32, chars_per_tick: usize) -> Self {
        Self {
            generation,
            target: String::new(),
            revealed: 0,
            chars_per_tick: chars_per_tick.max(1),
            sealed: false,
            cancelled: false,
            completed: false,
        }
    }

    /// Identifies this engine instance among the ones used for one bubble.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Replace the target with `text`, which must extend the current target.
    pub fn set_target(&mut self, text: &str) -> Result<(), SessionError> {
        if !text.starts_with(self.target.as_str()) {
            return Err(SessionError::TargetRewrite);
        }
        if text.len() > self.target.len() {
            self.target.push_str(&text[self.target.len()..]);
        }
        Ok(())
    }

    pub fn extend(&mut self, delta: &str) {
        self.target.push_str(delta);
    }

    /// No more growth will come.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Stop the reveal. Idempotent; later ticks are no-ops.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.cancelled {
            return TickOutcome::Cancelled;
        }

        let advanced = if self.revealed < self.target.len() {
            self.revealed = self.target[self.revealed..]
                .char_indices()
                .nth(self.chars_per_tick)
                .map(|(offset, _)| self.revealed + offset)
                .unwrap_or(self.target.len());
            true
        } else {
            false
        };

        if self.take_completion() {
            TickOutcome::Completed
        } else if advanced {
            TickOutcome::Advanced
        } else {
            TickOutcome::CaughtUp
        }
    }

    /// Report completion once, without advancing. Used when the engine is
    /// sealed while already caught up.
    pub fn take_completion(&mut self) -> bool {
        if self.cancelled || self.completed || !self.sealed || !self.is_caught_up() {
            return false;
        }
        self.completed = true;
        true
    }

    pub fn revealed(&self) -> &str {
        &self.target[..self.revealed]
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn is_caught_up(&self) -> bool {
        self.revealed == self.target.len()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }
}
