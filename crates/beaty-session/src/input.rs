use beaty_core::types::SessionId;
use beaty_stream::StreamEvent;

use crate::camera::SettleTicket;
use crate::scheduler::TimerKey;

/// Everything the session layer reacts to, funneled through one inbox.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// A decoded frame of the response stream for `session`.
    Stream {
        session: SessionId,
        event: StreamEvent,
    },
    Timer(TimerKey),
    /// The camera finished the animation identified by the ticket.
    Settled(SettleTicket),
}

impl Input {
    /// The session this input belongs to.
    pub fn session(&self) -> SessionId {
        match self {
            Input::Stream { session, .. } => *session,
            Input::Timer(key) => key.session,
            Input::Settled(ticket) => ticket.session,
        }
    }
}
