//! The map camera collaborator.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tracing::trace;

use beaty_core::config::EdgePadding;
use beaty_core::types::{Bounds, LatLng, MarkerSet, SessionId};

use crate::input::Input;

/// Identifies one camera animation of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SettleTicket {
    pub session: SessionId,
    pub animation: u32,
}

/// One-shot notification that a camera animation finished.
///
/// Firing consumes the signal, so it can be delivered at most once. Dropping
/// it without firing leaves the waiting session to its settle timeout.
#[derive(Debug)]
pub struct SettleSignal {
    ticket: SettleTicket,
    inbox: UnboundedSender<Input>,
}

impl SettleSignal {
    pub(crate) fn new(ticket: SettleTicket, inbox: UnboundedSender<Input>) -> Self {
        Self { ticket, inbox }
    }

    pub fn ticket(&self) -> SettleTicket {
        self.ticket
    }

    pub fn fire(self) {
        if self.inbox.send(Input::Settled(self.ticket)).is_err() {
            trace!(session = %self.ticket.session, "settle signal after shutdown");
        }
    }
}

/// Map camera and marker primitives, implemented by the host.
///
/// Calls are made synchronously from the session loop and must not block.
pub trait CameraCoordinator: Send {
    fn set_center_and_zoom(&mut self, center: LatLng, zoom: f64, duration: Duration);

    fn fit_bounds(&mut self, bounds: Bounds, padding: EdgePadding, max_zoom: f64, duration: Duration);

    /// Fire `signal` once the animation most recently requested has finished.
    fn on_settled(&mut self, signal: SettleSignal);

    fn place_markers(&mut self, markers: &MarkerSet);

    fn clear_markers(&mut self);
}
