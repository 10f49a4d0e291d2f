//! Scripted collaborators for driving the session layer without a map, a UI
//! or a server.
//!
//! Each recorder is a cheap clonable handle over shared state: hand one clone
//! to the session layer and inspect the other.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use beaty_core::config::EdgePadding;
use beaty_core::events::UiEvent;
use beaty_core::types::{Bounds, LatLng, MarkerSet, QueryRequest, SessionId, SessionPhase};
use beaty_stream::{EventStream, QueryTransport, StreamError, StreamEvent};

use crate::camera::{CameraCoordinator, SettleSignal, SettleTicket};
use crate::observer::{phase_event, SessionObserver};
use crate::session::ResponseSession;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Camera
// =============================================================================

/// A call made on the camera collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum CameraCall {
    CenterAndZoom {
        center: LatLng,
        zoom: f64,
        duration: Duration,
    },
    FitBounds {
        bounds: Bounds,
        padding: EdgePadding,
        max_zoom: f64,
        duration: Duration,
    },
    Subscribed(SettleTicket),
    PlaceMarkers(MarkerSet),
    ClearMarkers,
}

#[derive(Debug, Default)]
struct CameraLog {
    calls: Vec<CameraCall>,
    pending: VecDeque<SettleSignal>,
    on_map: MarkerSet,
    auto_settle: bool,
}

/// Camera that records calls and holds settle signals until told to fire.
#[derive(Debug, Clone, Default)]
pub struct RecordingCamera {
    log: Arc<Mutex<CameraLog>>,
}

impl RecordingCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// A camera whose animations finish instantly.
    pub fn auto_settling() -> Self {
        let camera = Self::default();
        lock(&camera.log).auto_settle = true;
        camera
    }

    pub fn calls(&self) -> Vec<CameraCall> {
        lock(&self.log).calls.clone()
    }

    /// Markers a map would currently display.
    pub fn on_map(&self) -> MarkerSet {
        lock(&self.log).on_map.clone()
    }

    pub fn pending_signals(&self) -> usize {
        lock(&self.log).pending.len()
    }

    /// Fire the oldest held settle signal. Returns whether there was one.
    pub fn settle(&self) -> bool {
        let signal = lock(&self.log).pending.pop_front();
        match signal {
            Some(signal) => {
                signal.fire();
                true
            }
            None => false,
        }
    }

    /// Drop every held settle signal without firing it.
    pub fn stall(&self) {
        lock(&self.log).pending.clear();
    }
}

impl CameraCoordinator for RecordingCamera {
    fn set_center_and_zoom(&mut self, center: LatLng, zoom: f64, duration: Duration) {
        lock(&self.log).calls.push(CameraCall::CenterAndZoom {
            center,
            zoom,
            duration,
        });
    }

    fn fit_bounds(&mut self, bounds: Bounds, padding: EdgePadding, max_zoom: f64, duration: Duration) {
        lock(&self.log).calls.push(CameraCall::FitBounds {
            bounds,
            padding,
            max_zoom,
            duration,
        });
    }

    fn on_settled(&mut self, signal: SettleSignal) {
        let mut log = lock(&self.log);
        log.calls.push(CameraCall::Subscribed(signal.ticket()));
        if log.auto_settle {
            drop(log);
            signal.fire();
        } else {
            log.pending.push_back(signal);
        }
    }

    fn place_markers(&mut self, markers: &MarkerSet) {
        let mut log = lock(&self.log);
        log.calls.push(CameraCall::PlaceMarkers(markers.clone()));
        log.on_map = markers.clone();
    }

    fn clear_markers(&mut self) {
        let mut log = lock(&self.log);
        log.calls.push(CameraCall::ClearMarkers);
        log.on_map = MarkerSet::empty();
    }
}

// =============================================================================
// Observer
// =============================================================================

/// Observer that records every effect as a [`UiEvent`].
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<UiEvent>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<UiEvent> {
        lock(&self.events).clone()
    }

    /// Every phase `session` went through, in order.
    pub fn phases(&self, session: SessionId) -> Vec<SessionPhase> {
        lock(&self.events)
            .iter()
            .filter_map(|e| match e {
                UiEvent::PhaseChanged { session: s, phase, .. } if *s == session => Some(*phase),
                _ => None,
            })
            .collect()
    }

    /// Every visible text `session` showed, in order.
    pub fn texts(&self, session: SessionId) -> Vec<String> {
        lock(&self.events)
            .iter()
            .filter_map(|e| match e {
                UiEvent::TextRevealed { session: s, text, .. } if *s == session => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_text(&self, session: SessionId) -> Option<String> {
        self.texts(session).pop()
    }

    pub fn errors(&self, session: SessionId) -> Vec<String> {
        lock(&self.events)
            .iter()
            .filter_map(|e| match e {
                UiEvent::ErrorShown { session: s, message, .. } if *s == session => {
                    Some(message.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub fn dismissed(&self, session: SessionId) -> bool {
        lock(&self.events)
            .iter()
            .any(|e| matches!(e, UiEvent::BubbleDismissed { session: s, .. } if *s == session))
    }

    pub fn clear(&self) {
        lock(&self.events).clear();
    }

    fn push(&self, event: UiEvent) {
        lock(&self.events).push(event);
    }
}

impl SessionObserver for RecordingObserver {
    fn on_phase_change(&mut self, session: &ResponseSession) {
        self.push(phase_event(session));
    }

    fn on_text_revealed(&mut self, session: SessionId, text: &str) {
        self.push(UiEvent::TextRevealed {
            session,
            text: text.to_string(),
            at: chrono::Utc::now(),
        });
    }

    fn on_error(&mut self, session: SessionId, message: &str) {
        self.push(UiEvent::ErrorShown {
            session,
            message: message.to_string(),
            at: chrono::Utc::now(),
        });
    }

    fn on_dismiss(&mut self, session: SessionId) {
        self.push(UiEvent::BubbleDismissed {
            session,
            at: chrono::Utc::now(),
        });
    }
}

// =============================================================================
// Transport
// =============================================================================

/// Canned response for one `open` call.
#[derive(Debug, Clone)]
pub enum Script {
    /// Deliver the events and end the stream.
    Complete(Vec<StreamEvent>),
    /// Deliver each event after its delay, then end the stream.
    Paced(Vec<(Duration, StreamEvent)>),
    /// Deliver the events, then never produce anything again.
    Hang(Vec<StreamEvent>),
    /// Fail to open with this HTTP status.
    Reject(u16),
}

/// Transport that answers each query with the next script.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<QueryRequest>>,
}

impl ScriptedTransport {
    pub fn new(scripts: impl IntoIterator<Item = Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<QueryRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl QueryTransport for ScriptedTransport {
    async fn open(&self, request: &QueryRequest) -> Result<EventStream, StreamError> {
        lock(&self.requests).push(request.clone());
        let script = lock(&self.scripts).pop_front();
        match script {
            Some(Script::Complete(events)) => Ok(Box::pin(futures::stream::iter(events))),
            Some(Script::Paced(events)) => Ok(Box::pin(futures::stream::iter(events).then(
                |(delay, event)| async move {
                    tokio::time::sleep(delay).await;
                    event
                },
            ))),
            Some(Script::Hang(events)) => Ok(Box::pin(
                futures::stream::iter(events).chain(futures::stream::pending()),
            )),
            Some(Script::Reject(status)) => Err(StreamError::Status(status)),
            None => Err(StreamError::Network("no scripted response".to_string())),
        }
    }
}
