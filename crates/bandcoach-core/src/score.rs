//! Predicted band score state.

use serde::{Deserialize, Serialize};

/// Lowest attainable band.
pub const MIN_BAND: f64 = 0.0;
/// Highest attainable band.
pub const MAX_BAND: f64 = 9.0;

/// Clamp to the band range and round to two decimal places.
pub fn normalize_band(value: f64) -> f64 {
    if value.is_nan() {
        return MIN_BAND;
    }
    let clamped = value.clamp(MIN_BAND, MAX_BAND);
    (clamped * 100.0).round() / 100.0
}

/// The learner's current predicted band, goal, and decay flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreState {
    current: f64,
    goal: f64,
    #[serde(default)]
    decayed: bool,
}

impl ScoreState {
    pub fn new(current: f64, goal: f64) -> Self {
        Self {
            current: normalize_band(current),
            goal: normalize_band(goal),
            decayed: false,
        }
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn goal(&self) -> f64 {
        self.goal
    }

    /// `true` while a decay is in effect and no drill has repaired it.
    pub fn is_decayed(&self) -> bool {
        self.decayed
    }

    /// Add `delta`, clamping and rounding the result. Returns the new score.
    /// A non-finite `delta` leaves the score unchanged.
    pub fn apply_delta(&mut self, delta: f64) -> f64 {
        if !delta.is_finite() {
            return self.current;
        }
        self.current = normalize_band(self.current + delta);
        self.current
    }

    /// Subtract `amount` and mark the score as decayed.
    ///
    /// The caller is responsible for checking that no workflow owns the
    /// session; see [`crate::decay::DecayScheduler`].
    pub fn decay(&mut self, amount: f64) -> f64 {
        if !amount.is_finite() {
            return self.current;
        }
        self.current = normalize_band(self.current - amount);
        self.decayed = true;
        self.current
    }

    pub fn clear_decay(&mut self) {
        self.decayed = false;
    }

    /// Overwrite the score with a value supplied by the assessment service.
    pub(crate) fn set(&mut self, value: f64) -> f64 {
        self.current = normalize_band(value);
        self.current
    }

    /// Administrative override. Clears the decay flag; weaknesses are not
    /// this type's concern and stay as they are.
    pub fn reset(&mut self, value: f64) {
        self.current = normalize_band(value);
        self.decayed = false;
    }

    /// Percentage of the goal reached, e.g. 72.0 for 5.4 of 7.5.
    pub fn progress_to_goal(&self) -> f64 {
        if self.goal <= 0.0 {
            return 100.0;
        }
        self.current / self.goal * 100.0
    }
}

impl Default for ScoreState {
    fn default() -> Self {
        Self::new(5.4, 7.5)
    }
}
