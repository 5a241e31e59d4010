//! Inactivity decay.
//!
//! Detecting inactivity is the caller's job; this module only applies the
//! effect, and only while the session is idle.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::controller::{OverlayState, SessionController};
use crate::score::ScoreState;
use crate::streak::StreakState;

/// Default band reduction per decay event.
pub const DEFAULT_DECAY_AMOUNT: f64 = 0.05;

/// Result of a decay attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DecayOutcome {
    Applied { from: f64, to: f64 },
    /// The session was not idle; nothing changed.
    Rejected { state: OverlayState },
}

impl DecayOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, DecayOutcome::Applied { .. })
    }
}

/// Applies decay events under the controller's exclusivity rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayScheduler {
    amount: f64,
}

impl DecayScheduler {
    /// A non-finite `amount` falls back to [`DEFAULT_DECAY_AMOUNT`].
    pub fn new(amount: f64) -> Self {
        if !amount.is_finite() {
            tracing::warn!(amount, "non-finite decay amount, using default");
            return Self::default();
        }
        Self {
            amount: amount.abs(),
        }
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// Decay by the configured amount.
    pub fn trigger(&self, controller: &SessionController, score: &mut ScoreState) -> DecayOutcome {
        self.trigger_by(self.amount, controller, score)
    }

    /// Decay by `amount`. Each call compounds; the decayed flag does not
    /// guard against repeated application.
    pub fn trigger_by(
        &self,
        amount: f64,
        controller: &SessionController,
        score: &mut ScoreState,
    ) -> DecayOutcome {
        if !controller.is_idle() {
            let state = match controller.active() {
                Some(active) if controller.state() == OverlayState::None => {
                    active.task.kind.overlay()
                }
                _ => controller.state(),
            };
            tracing::warn!(%state, "decay rejected while session is not idle");
            return DecayOutcome::Rejected { state };
        }
        let from = score.current();
        let to = score.decay(amount.abs());
        tracing::info!(from, to, "score decayed");
        DecayOutcome::Applied { from, to }
    }
}

impl Default for DecayScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_DECAY_AMOUNT)
    }
}

/// Whether an inactivity monitor should fire a decay for `today`.
///
/// Fires when the learner has been inactive for at least `threshold_days`
/// and the score is not already marked decayed, so one inactivity window
/// produces at most one event.
pub fn inactivity_due(
    streak: &StreakState,
    score: &ScoreState,
    today: NaiveDate,
    threshold_days: u32,
) -> bool {
    if score.is_decayed() {
        return false;
    }
    streak
        .days_inactive(today)
        .is_some_and(|days| days >= i64::from(threshold_days))
}
