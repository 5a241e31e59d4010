//! Session error types.
//!
//! Every variant describes an operation that was rejected before any state
//! was touched. Out-of-range score deltas and duplicate weaknesses are not
//! errors: they are clamped and ignored respectively.

use thiserror::Error;

use crate::controller::OverlayState;

/// Errors surfaced by session operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// The assessment result is malformed and was not ingested.
    #[error("invalid assessment ({correct}/{total}): {reason}")]
    InvalidAssessment {
        correct: u32,
        total: u32,
        reason: &'static str,
    },

    /// Another workflow currently owns the session.
    #[error("a {active} workflow is already running")]
    WorkflowBusy { active: OverlayState },

    /// A recording operation was requested while no recording is running.
    #[error("no recording in progress (overlay is {state})")]
    NotRecording { state: OverlayState },

    /// A score delta or decay amount is NaN or infinite.
    #[error("band delta {0} is not a finite number")]
    InvalidDelta(f64),

    /// An administrative reset value lies outside the band range.
    #[error("score {0} is outside the band range 0-9")]
    ScoreOutOfRange(f64),
}

impl SessionError {
    /// Returns `true` if retrying once the session is idle may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SessionError::WorkflowBusy { .. } | SessionError::NotRecording { .. }
        )
    }
}
