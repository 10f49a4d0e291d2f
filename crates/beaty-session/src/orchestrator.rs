//! Response orchestrator: drives one session's visible effects.
//!
//! Every input is applied synchronously: phase changes reach the observer
//! before any timer is armed or any camera call is made for the next step.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use beaty_core::config::{BeatyConfig, CameraConfig, RevealConfig};
use beaty_core::types::{
    CameraRegion, Intent, MarkerSet, QueryRequest, SessionId, SessionPhase,
};
use beaty_stream::{DataPayload, StreamEvent};

use crate::camera::{SettleSignal, SettleTicket};
use crate::scheduler::{TimerKey, TimerKind};
use crate::session::ResponseSession;
use crate::surface::Surface;
use crate::typewriter::{TickOutcome, TypewriterEngine};

/// Tunables shared by every session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub reveal: RevealConfig,
    pub camera: CameraConfig,
    /// Countdown before a fully revealed bubble hides; `None` keeps it.
    pub auto_dismiss: Option<Duration>,
}

impl SessionSettings {
    pub fn from_config(config: &BeatyConfig) -> Self {
        Self {
            reveal: config.reveal.clone(),
            camera: config.camera.clone(),
            auto_dismiss: config.bubble.auto_dismiss(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&BeatyConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    Open,
    /// Text is held back until this camera animation settles.
    Awaiting(SettleTicket),
}

/// Owns the [`Surface`] for the lifetime of one session.
pub struct ResponseOrchestrator {
    session: ResponseSession,
    surface: Surface,
    settings: Arc<SessionSettings>,
    engine: TypewriterEngine,
    /// The engine is revealing the placeholder rather than response text.
    showing_placeholder: bool,
    ticking: bool,
    /// Bumped every time ticking is (re)armed; older ticks are stale.
    tick_arm: u32,
    /// Byte length of the text last reported to the observer.
    shown: usize,
    gate: Gate,
    animations: u32,
    data_seen: bool,
    /// `Done` was received; the buffer will not grow.
    frozen: bool,
    dismiss_armed: bool,
}

impl ResponseOrchestrator {
    /// Begin a session: announce it and start the placeholder.
    pub fn start(
        id: SessionId,
        request: QueryRequest,
        surface: Surface,
        settings: Arc<SessionSettings>,
    ) -> Self {
        let engine = TypewriterEngine::new(0, settings.reveal.chars_per_tick);
        let mut orchestrator = Self {
            session: ResponseSession::new(id, request),
            surface,
            settings,
            engine,
            showing_placeholder: false,
            ticking: false,
            tick_arm: 0,
            shown: 0,
            gate: Gate::Open,
            animations: 0,
            data_seen: false,
            frozen: false,
            dismiss_armed: false,
        };

        info!(
            session = %id,
            query_chars = orchestrator.session.request.text.chars().count(),
            "Session started"
        );
        orchestrator
            .surface
            .observer
            .on_phase_change(&orchestrator.session);

        if !orchestrator.settings.reveal.placeholder.is_empty() {
            orchestrator.showing_placeholder = true;
            let placeholder = orchestrator.settings.reveal.placeholder.clone();
            orchestrator.engine.extend(&placeholder);
            orchestrator.engine.seal();
            orchestrator.advance();
            orchestrator.ensure_ticking();
        }
        orchestrator
    }

    pub fn session(&self) -> &ResponseSession {
        &self.session
    }

    pub fn id(&self) -> SessionId {
        self.session.id
    }

    /// Text currently visible in the bubble.
    pub fn revealed(&self) -> &str {
        self.engine.revealed()
    }

    pub fn is_showing_placeholder(&self) -> bool {
        self.showing_placeholder
    }

    pub fn markers(&self) -> &MarkerSet {
        self.surface.markers()
    }

    /// Terminal, not waiting on the camera and not revealing.
    pub fn is_idle(&self) -> bool {
        self.session.is_terminal() && self.gate == Gate::Open && !self.ticking
    }

    // =========================================================================
    // Inputs
    // =========================================================================

    pub fn handle_event(&mut self, event: StreamEvent) {
        if self.session.is_terminal() {
            debug!(
                session = %self.session.id,
                kind = event.kind(),
                phase = %self.session.phase,
                "Event for finished session ignored"
            );
            return;
        }
        match event {
            StreamEvent::Data { intent, payload } => self.on_data(intent, payload),
            StreamEvent::Chunk { text } => self.on_chunk(&text),
            StreamEvent::Done => self.on_done(),
            StreamEvent::Error { message } => self.on_error(&message),
        }
    }

    pub fn handle_timer(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::RevealTick { generation, arm } => {
                let live = generation == self.engine.generation() && arm == self.tick_arm;
                if !live || !self.ticking {
                    trace!(session = %self.session.id, generation, arm, "Stale reveal tick dropped");
                    return;
                }
                self.advance();
            }
            TimerKind::SettleTimeout { animation } => match self.gate {
                Gate::Awaiting(ticket) if ticket.animation == animation => {
                    warn!(
                        session = %self.session.id,
                        timeout_ms = self.settings.camera.settle_timeout_ms,
                        "Camera did not settle in time, revealing anyway"
                    );
                    self.open_gate();
                }
                _ => trace!(session = %self.session.id, animation, "Stale settle timeout dropped"),
            },
            TimerKind::AutoDismiss => {
                if self.dismiss_armed {
                    self.dismiss_armed = false;
                    debug!(session = %self.session.id, "Bubble auto-dismissed");
                    self.surface.observer.on_dismiss(self.session.id);
                }
            }
        }
    }

    pub fn handle_settled(&mut self, ticket: SettleTicket) {
        match self.gate {
            Gate::Awaiting(expected) if expected == ticket => {
                let timeout = self.timer(TimerKind::SettleTimeout {
                    animation: ticket.animation,
                });
                self.surface.scheduler.cancel(&timeout);
                debug!(session = %self.session.id, animation = ticket.animation, "Camera settled");
                self.open_gate();
            }
            _ => trace!(session = %self.session.id, ?ticket, "Stale settle signal dropped"),
        }
    }

    /// Stop everything this session has pending and give up the surface.
    ///
    /// A session that has not finished is marked `Superseded`. Nothing it
    /// scheduled can take effect afterwards.
    pub fn supersede(mut self) -> Surface {
        self.halt();
        if !self.session.is_terminal() {
            info!(session = %self.session.id, phase = %self.session.phase, "Session superseded");
            self.set_phase(SessionPhase::Superseded);
        }
        self.surface
    }

    // =========================================================================
    // Stream events
    // =========================================================================

    fn on_data(&mut self, intent: Intent, payload: DataPayload) {
        self.data_seen = true;
        if self.showing_placeholder {
            self.stop_ticking();
        }
        if let Some(steps) = &payload.steps {
            debug!(session = %self.session.id, steps = %steps, "Pipeline steps");
        }

        let mut markers = payload.markers(intent);
        let intent = if intent.requires_markers() && markers.is_empty() {
            warn!(
                session = %self.session.id,
                intent = %intent,
                "No usable markers in data frame, rendering as general chat"
            );
            markers = MarkerSet::empty();
            Intent::GeneralChat
        } else {
            intent
        };
        info!(
            session = %self.session.id,
            intent = %intent,
            markers = markers.len(),
            count = ?payload.count,
            keyword = ?payload.search_keyword,
            "Data received"
        );

        self.session.intent = intent;
        self.session.markers = markers.clone();
        self.surface.replace_markers(markers);
        self.move_camera();
    }

    fn on_chunk(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.session.text_buffer.push_str(text);
        if let Gate::Awaiting(_) = self.gate {
            trace!(
                session = %self.session.id,
                buffered = self.session.text_buffer.len(),
                "Text held until the camera settles"
            );
            return;
        }
        self.reveal_buffer();
    }

    fn on_done(&mut self) {
        if !self.data_seen {
            warn!(
                session = %self.session.id,
                "Response finished without a data frame, rendering as general chat"
            );
            self.session.intent = Intent::GeneralChat;
            self.session.markers = MarkerSet::empty();
            self.surface.replace_markers(MarkerSet::empty());
        }
        self.frozen = true;
        info!(
            session = %self.session.id,
            chars = self.session.text_buffer.chars().count(),
            "Response complete"
        );
        self.set_phase(SessionPhase::Complete);
        // The countdown runs from Done, concurrently with any remaining reveal.
        if let Some(after) = self.settings.auto_dismiss {
            let key = self.timer(TimerKind::AutoDismiss);
            self.surface.scheduler.schedule_once(key, after);
            self.dismiss_armed = true;
        }
        if self.gate == Gate::Open {
            self.finish_reveal();
        }
    }

    fn on_error(&mut self, message: &str) {
        warn!(session = %self.session.id, error = %message, "Query failed");
        self.halt();
        self.replace_engine();
        self.session.text_buffer.clear();
        self.set_phase(SessionPhase::Errored);
        let apology = self.settings.reveal.error_message.clone();
        self.surface.observer.on_error(self.session.id, &apology);
    }

    // =========================================================================
    // Camera
    // =========================================================================

    fn move_camera(&mut self) {
        let settings = Arc::clone(&self.settings);
        let camera = &settings.camera;
        let intent = self.session.intent;

        match intent {
            Intent::GeneralChat => {}
            Intent::Landmark | Intent::Random => {
                if let Some(first) = self.session.markers.first() {
                    self.surface.camera.set_center_and_zoom(
                        first.position,
                        camera.fixed_zoom,
                        camera.animation(),
                    );
                }
            }
            Intent::FindPlace | Intent::Route | Intent::Recommend => {
                match self.session.markers.region() {
                    Some(CameraRegion::Fit(bounds)) => self.surface.camera.fit_bounds(
                        bounds,
                        camera.padding,
                        camera.max_zoom,
                        camera.animation(),
                    ),
                    Some(CameraRegion::Point(center)) => self.surface.camera.set_center_and_zoom(
                        center,
                        camera.fixed_zoom,
                        camera.animation(),
                    ),
                    None => return,
                }
                if intent.gates_reveal_on_camera() {
                    self.arm_settle_gate();
                }
            }
        }
    }

    fn arm_settle_gate(&mut self) {
        if !matches!(
            self.session.phase,
            SessionPhase::Requesting | SessionPhase::AwaitingCameraSettle
        ) {
            debug!(
                session = %self.session.id,
                "Reveal already running, camera moves without a gate"
            );
            return;
        }
        if let Gate::Awaiting(previous) = self.gate {
            let timeout = self.timer(TimerKind::SettleTimeout {
                animation: previous.animation,
            });
            self.surface.scheduler.cancel(&timeout);
        }

        self.animations += 1;
        let ticket = SettleTicket {
            session: self.session.id,
            animation: self.animations,
        };
        self.gate = Gate::Awaiting(ticket);
        if self.session.phase == SessionPhase::Requesting {
            self.set_phase(SessionPhase::AwaitingCameraSettle);
        }

        let signal = SettleSignal::new(ticket, self.surface.inbox.clone());
        self.surface.camera.on_settled(signal);
        let timeout = self.timer(TimerKind::SettleTimeout {
            animation: ticket.animation,
        });
        self.surface
            .scheduler
            .schedule_once(timeout, self.settings.camera.settle_timeout());
    }

    fn open_gate(&mut self) {
        self.gate = Gate::Open;
        if self.session.phase == SessionPhase::AwaitingCameraSettle {
            self.set_phase(SessionPhase::Revealing);
        }
        if self.frozen {
            self.finish_reveal();
        } else {
            self.reveal_buffer();
        }
    }

    // =========================================================================
    // Reveal
    // =========================================================================

    /// Point the engine at the whole buffer, replacing the placeholder the
    /// first time real text is shown.
    fn reveal_buffer(&mut self) {
        if self.session.text_buffer.is_empty() {
            return;
        }
        if self.session.phase == SessionPhase::Requesting {
            self.set_phase(SessionPhase::Revealing);
        }
        if self.showing_placeholder {
            self.replace_engine();
        }

        let first_text = self.engine.revealed().is_empty();
        if let Err(e) = self.engine.set_target(&self.session.text_buffer) {
            warn!(session = %self.session.id, error = %e, "Reveal target rejected");
            return;
        }
        if first_text {
            self.advance();
        }
        self.ensure_ticking();
    }

    /// Reveal whatever is buffered, then let the engine complete.
    fn finish_reveal(&mut self) {
        if self.session.text_buffer.is_empty() && self.showing_placeholder {
            self.replace_engine();
            self.surface.observer.on_text_revealed(self.session.id, "");
        } else {
            self.reveal_buffer();
        }

        self.engine.seal();
        if self.engine.take_completion() {
            self.stop_ticking();
            self.on_reveal_complete();
        } else {
            self.ensure_ticking();
        }
    }

    /// Cancel the current engine and start the next generation.
    fn replace_engine(&mut self) {
        self.engine.cancel();
        self.stop_ticking();
        let generation = self.engine.generation() + 1;
        self.engine = TypewriterEngine::new(generation, self.settings.reveal.chars_per_tick);
        self.showing_placeholder = false;
        self.shown = 0;
    }

    fn advance(&mut self) {
        match self.engine.tick() {
            TickOutcome::Advanced => self.emit_revealed(),
            TickOutcome::CaughtUp | TickOutcome::Cancelled => self.stop_ticking(),
            TickOutcome::Completed => {
                self.emit_revealed();
                self.stop_ticking();
                self.on_reveal_complete();
            }
        }
    }

    fn emit_revealed(&mut self) {
        let text = self.engine.revealed();
        if text.len() != self.shown {
            self.shown = text.len();
            self.surface.observer.on_text_revealed(self.session.id, text);
        }
    }

    fn on_reveal_complete(&mut self) {
        if self.showing_placeholder {
            return;
        }
        debug!(
            session = %self.session.id,
            chars = self.engine.revealed().chars().count(),
            "Reveal complete"
        );
    }

    fn ensure_ticking(&mut self) {
        if self.ticking || self.engine.is_caught_up() || self.engine.is_cancelled() {
            return;
        }
        self.tick_arm = self.tick_arm.wrapping_add(1);
        let key = self.tick_key();
        self.surface
            .scheduler
            .schedule_every(key, self.settings.reveal.tick_interval());
        self.ticking = true;
    }

    fn stop_ticking(&mut self) {
        if self.ticking {
            let key = self.tick_key();
            self.surface.scheduler.cancel(&key);
            self.ticking = false;
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Cancel every timer, the engine and the settle wait.
    fn halt(&mut self) {
        self.surface.scheduler.cancel_session(self.session.id);
        self.engine.cancel();
        self.ticking = false;
        self.gate = Gate::Open;
        self.dismiss_armed = false;
    }

    fn set_phase(&mut self, target: SessionPhase) {
        match self.session.transition(target) {
            Ok(()) => self.surface.observer.on_phase_change(&self.session),
            Err(e) => warn!(session = %self.session.id, error = %e, "Phase transition rejected"),
        }
    }

    fn timer(&self, kind: TimerKind) -> TimerKey {
        TimerKey::new(self.session.id, kind)
    }

    fn tick_key(&self) -> TimerKey {
        self.timer(TimerKind::RevealTick {
            generation: self.engine.generation(),
            arm: self.tick_arm,
        })
    }
}

impl std::fmt::Debug for ResponseOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseOrchestrator")
            .field("session", &self.session.id)
            .field("phase", &self.session.phase)
            .field("gate", &self.gate)
            .field("generation", &self.engine.generation())
            .field("ticking", &self.ticking)
            .finish()
    }
}
