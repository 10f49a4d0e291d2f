use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Intent, SessionId, SessionPhase};

/// Everything the host UI can observe about response sessions.
///
/// Emitted synchronously by the session layer, in the order the effects were
/// applied, and forwarded to the host over a channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum UiEvent {
    /// A session entered a new lifecycle phase.
    PhaseChanged {
        session: SessionId,
        phase: SessionPhase,
        intent: Intent,
        markers: usize,
        at: DateTime<Utc>,
    },

    /// The visible bubble text changed. `text` is the full visible prefix.
    TextRevealed {
        session: SessionId,
        text: String,
        at: DateTime<Utc>,
    },

    /// The session failed; `message` is the fixed user-facing string.
    ErrorShown {
        session: SessionId,
        message: String,
        at: DateTime<Utc>,
    },

    /// A floating bubble hid itself after its countdown.
    BubbleDismissed {
        session: SessionId,
        at: DateTime<Utc>,
    },
}

impl UiEvent {
    pub fn session(&self) -> SessionId {
        match self {
            UiEvent::PhaseChanged { session, .. }
            | UiEvent::TextRevealed { session, .. }
            | UiEvent::ErrorShown { session, .. }
            | UiEvent::BubbleDismissed { session, .. } => *session,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            UiEvent::PhaseChanged { at, .. }
            | UiEvent::TextRevealed { at, .. }
            | UiEvent::ErrorShown { at, .. }
            | UiEvent::BubbleDismissed { at, .. } => *at,
        }
    }

    /// Returns a stable event name for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            UiEvent::PhaseChanged { .. } => "phase_changed",
            UiEvent::TextRevealed { .. } => "text_revealed",
            UiEvent::ErrorShown { .. } => "error_shown",
            UiEvent::BubbleDismissed { .. } => "bubble_dismissed",
        }
    }
}
