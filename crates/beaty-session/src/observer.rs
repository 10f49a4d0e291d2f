//! Host UI callbacks.

use chrono::Utc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::trace;

use beaty_core::events::UiEvent;
use beaty_core::types::SessionId;

use crate::session::ResponseSession;

/// Receives every UI-visible effect of the session layer, in order.
pub trait SessionObserver: Send {
    fn on_phase_change(&mut self, session: &ResponseSession);

    /// `text` is the complete visible bubble text, not a delta.
    fn on_text_revealed(&mut self, session: SessionId, text: &str);

    /// `message` is the fixed user-facing apology.
    fn on_error(&mut self, session: SessionId, message: &str);

    fn on_dismiss(&mut self, _session: SessionId) {}
}

pub(crate) fn phase_event(session: &ResponseSession) -> UiEvent {
    UiEvent::PhaseChanged {
        session: session.id,
        phase: session.phase,
        intent: session.intent,
        markers: session.markers.len(),
        at: Utc::now(),
    }
}

/// Forwards effects to the host as [`UiEvent`]s.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: UnboundedSender<UiEvent>,
}

impl ChannelObserver {
    pub fn new(tx: UnboundedSender<UiEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: UiEvent) {
        if let Err(e) = self.tx.send(event) {
            trace!(event = e.0.event_name(), "UI receiver gone");
        }
    }
}

impl SessionObserver for ChannelObserver {
    fn on_phase_change(&mut self, session: &ResponseSession) {
        self.send(phase_event(session));
    }

    fn on_text_revealed(&mut self, session: SessionId, text: &str) {
        self.send(UiEvent::TextRevealed {
            session,
            text: text.to_string(),
            at: Utc::now(),
        });
    }

    fn on_error(&mut self, session: SessionId, message: &str) {
        self.send(UiEvent::ErrorShown {
            session,
            message: message.to_string(),
            at: Utc::now(),
        });
    }

    fn on_dismiss(&mut self, session: SessionId) {
        self.send(UiEvent::BubbleDismissed {
            session,
            at: Utc::now(),
        });
    }
}
