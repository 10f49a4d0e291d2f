//! Error types for session orchestration.

use beaty_core::error::BeatyError;
use beaty_core::types::SessionPhase;

/// Errors from the session layer.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("query cannot be empty")]
    EmptyQuery,
    #[error("invalid phase transition: {from} -> {to}")]
    InvalidTransition { from: SessionPhase, to: SessionPhase },
    #[error("typewriter target may only grow")]
    TargetRewrite,
    #[error("map surface is not attached")]
    SurfaceDetached,
}

impl From<SessionError> for BeatyError {
    fn from(err: SessionError) -> Self {
        BeatyError::Session(err.to_string())
    }
}
