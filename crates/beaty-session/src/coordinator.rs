//! Single-flight session coordinator.
//!
//! At most one session is current. Submitting a query supersedes the current
//! one before the new session produces any effect, and inputs addressed to
//! any other session are dropped before they reach an orchestrator.

use std::sync::Arc;

use tracing::{info, trace};

use beaty_core::types::{MarkerSet, QueryRequest, SessionId};

use crate::error::SessionError;
use crate::input::Input;
use crate::orchestrator::{ResponseOrchestrator, SessionSettings};
use crate::session::ResponseSession;
use crate::surface::Surface;

static NO_MARKERS: MarkerSet = MarkerSet::empty();

#[derive(Debug)]
enum Slot {
    Idle(Surface),
    Active(Box<ResponseOrchestrator>),
}

impl Slot {
    fn into_surface(self) -> Surface {
        match self {
            Slot::Idle(surface) => surface,
            Slot::Active(orchestrator) => orchestrator.supersede(),
        }
    }
}

/// Owns the surface and routes inputs to the current session.
#[derive(Debug)]
pub struct SessionQueryCoordinator {
    /// Always `Some` outside of `submit`.
    slot: Option<Slot>,
    last_id: SessionId,
    settings: Arc<SessionSettings>,
}

impl SessionQueryCoordinator {
    pub fn new(surface: Surface, settings: SessionSettings) -> Self {
        Self {
            slot: Some(Slot::Idle(surface)),
            last_id: SessionId(0),
            settings: Arc::new(settings),
        }
    }

    /// Start a session for `request`, superseding the current one.
    ///
    /// The previous session's timers, reveal and settle wait are cancelled
    /// before the new session is created.
    pub fn submit(&mut self, request: QueryRequest) -> Result<SessionId, SessionError> {
        if request.text.trim().is_empty() {
            return Err(SessionError::EmptyQuery);
        }
        let surface = self
            .slot
            .take()
            .ok_or(SessionError::SurfaceDetached)?
            .into_surface();

        let id = self.last_id.next();
        self.last_id = id;
        let orchestrator =
            ResponseOrchestrator::start(id, request, surface, Arc::clone(&self.settings));
        self.slot = Some(Slot::Active(Box::new(orchestrator)));
        Ok(id)
    }

    /// Apply one input. Inputs for any session but the current one are dropped.
    pub fn handle(&mut self, input: Input) {
        let Some(Slot::Active(orchestrator)) = self.slot.as_mut() else {
            trace!(session = %input.session(), "Input with no active session dropped");
            return;
        };
        if input.session() != orchestrator.id() {
            trace!(
                session = %input.session(),
                current = %orchestrator.id(),
                "Stale input dropped"
            );
            return;
        }
        match input {
            Input::Stream { event, .. } => orchestrator.handle_event(event),
            Input::Timer(key) => orchestrator.handle_timer(key.kind),
            Input::Settled(ticket) => orchestrator.handle_settled(ticket),
        }
    }

    /// Supersede the current session, if any, and release its effects.
    pub fn cancel(&mut self) {
        if let Some(slot) = self.slot.take() {
            if let Slot::Active(orchestrator) = &slot {
                info!(session = %orchestrator.id(), "Session cancelled");
            }
            self.slot = Some(Slot::Idle(slot.into_surface()));
        }
    }

    pub fn current_id(&self) -> Option<SessionId> {
        self.orchestrator().map(|o| o.id())
    }

    /// Snapshot of the current session.
    pub fn current(&self) -> Option<&ResponseSession> {
        self.orchestrator().map(|o| o.session())
    }

    /// Markers on the map.
    pub fn markers(&self) -> &MarkerSet {
        match &self.slot {
            Some(Slot::Idle(surface)) => surface.markers(),
            Some(Slot::Active(orchestrator)) => orchestrator.markers(),
            None => &NO_MARKERS,
        }
    }

    /// Text visible in the bubble for the current session.
    pub fn revealed(&self) -> Option<&str> {
        self.orchestrator().map(|o| o.revealed())
    }

    /// No session is making progress on its own.
    pub fn is_idle(&self) -> bool {
        self.orchestrator().map_or(true, |o| o.is_idle())
    }

    fn orchestrator(&self) -> Option<&ResponseOrchestrator> {
        match &self.slot {
            Some(Slot::Active(orchestrator)) => Some(&**orchestrator),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::{RecordingCamera, RecordingObserver};
    use crate::scheduler::{ManualScheduler, TimerKey, TimerKind};
    use beaty_core::types::SessionPhase;
    use beaty_stream::StreamEvent;
    use tokio::sync::mpsc;

    fn coordinator() -> (SessionQueryCoordinator, RecordingObserver) {
        let (tx, _rx) = mpsc::unbounded_channel();
        let observer = RecordingObserver::new();
        let surface = Surface::new(
            RecordingCamera::new(),
            observer.clone(),
            ManualScheduler::new(),
            tx,
        );
        (
            SessionQueryCoordinator::new(surface, SessionSettings::default()),
            observer,
        )
    }

    #[test]
    fn test_starts_idle() {
        let (coordinator, _) = coordinator();
        assert!(coordinator.is_idle());
        assert_eq!(coordinator.current_id(), None);
        assert_eq!(coordinator.revealed(), None);
        assert!(coordinator.markers().is_empty());
    }

    #[test]
    fn test_input_without_session_is_dropped() {
        let (mut coordinator, observer) = coordinator();
        coordinator.handle(Input::Stream {
            session: SessionId(1),
            event: StreamEvent::Chunk { text: "x".into() },
        });
        coordinator.handle(Input::Timer(TimerKey::new(SessionId(1), TimerKind::AutoDismiss)));
        assert!(observer.events().is_empty());
    }

    #[test]
    fn test_ids_start_at_one() {
        let (mut coordinator, _) = coordinator();
        assert_eq!(coordinator.submit(QueryRequest::new("a")).unwrap(), SessionId(1));
        assert_eq!(coordinator.submit(QueryRequest::new("b")).unwrap(), SessionId(2));
    }

    #[test]
    fn test_rejected_submit_keeps_current_session() {
        let (mut coordinator, _) = coordinator();
        let id = coordinator.submit(QueryRequest::new("a")).unwrap();
        assert!(coordinator.submit(QueryRequest::new("\n\t")).is_err());
        assert_eq!(coordinator.current_id(), Some(id));
        assert_eq!(
            coordinator.current().map(|s| s.phase),
            Some(SessionPhase::Requesting)
        );
    }

    #[test]
    fn test_stale_stream_event_is_dropped() {
        let (mut coordinator, _) = coordinator();
        let old = coordinator.submit(QueryRequest::new("a")).unwrap();
        coordinator.submit(QueryRequest::new("b")).unwrap();
        coordinator.handle(Input::Stream {
            session: old,
            event: StreamEvent::Chunk { text: "old".into() },
        });
        assert!(coordinator.current().unwrap().text_buffer.is_empty());
    }
}
