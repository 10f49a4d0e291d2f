//! Per-query session record and its phase state machine.
//!
//! Valid transitions:
//! - Requesting -> AwaitingCameraSettle (gated camera move started)
//! - Requesting -> Revealing (first text shown)
//! - AwaitingCameraSettle -> Revealing (camera settled or timed out)
//! - any non-terminal -> Complete | Errored | Superseded

use chrono::{DateTime, Utc};

use beaty_core::types::{Intent, MarkerSet, QueryRequest, SessionId, SessionPhase};

use crate::error::SessionError;

/// The state of one submitted query.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSession {
    pub id: SessionId,
    pub request: QueryRequest,
    pub intent: Intent,
    /// Markers this session installed on the map.
    pub markers: MarkerSet,
    /// Response text received so far. Frozen at `Done`, cleared on error.
    pub text_buffer: String,
    pub phase: SessionPhase,
    pub started_at: DateTime<Utc>,
}

impl ResponseSession {
    pub fn new(id: SessionId, request: QueryRequest) -> Self {
        Self {
            id,
            request,
            intent: Intent::GeneralChat,
            markers: MarkerSet::empty(),
            text_buffer: String::new(),
            phase: SessionPhase::Requesting,
            started_at: Utc::now(),
        }
    }

    /// Move to `target`, rejecting transitions the lifecycle does not allow.
    pub fn transition(&mut self, target: SessionPhase) -> Result<(), SessionError> {
        if !self.phase.can_transition_to(&target) {
            return Err(SessionError::InvalidTransition {
                from: self.phase,
                to: target,
            });
        }
        tracing::debug!(session = %self.id, "Session phase: {} -> {}", self.phase, target);
        self.phase = target;
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }
}
