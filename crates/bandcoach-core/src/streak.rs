//! Consecutive practice-day tracking.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Number of consecutive days with at least one completed practice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    days: u32,
    #[serde(default)]
    last_active: Option<NaiveDate>,
}

impl StreakState {
    pub fn new(days: u32, last_active: Option<NaiveDate>) -> Self {
        Self { days, last_active }
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    pub fn last_active(&self) -> Option<NaiveDate> {
        self.last_active
    }

    /// Record practice on `date`. Returns the streak length afterwards.
    ///
    /// Same-day practice is a no-op, the next calendar day extends the
    /// streak, and any gap starts a new streak at 1. Dates earlier than the
    /// last active day are ignored so the count never goes backwards.
    pub fn record_practice(&mut self, date: NaiveDate) -> u32 {
        match self.last_active {
            Some(last) if date <= last => {}
            Some(last) if (date - last).num_days() == 1 => {
                self.days += 1;
                self.last_active = Some(date);
            }
            Some(_) => {
                self.days = 1;
                self.last_active = Some(date);
            }
            None => {
                self.days = self.days.max(1);
                self.last_active = Some(date);
            }
        }
        self.days
    }

    /// Whole days since the last practice, or `None` if never practised.
    pub fn days_inactive(&self, today: NaiveDate) -> Option<i64> {
        self.last_active
            .map(|last| (today - last).num_days().max(0))
    }

    pub fn reset(&mut self) {
        self.days = 0;
        self.last_active = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn consecutive_days_extend_streak() {
        let mut streak = StreakState::new(0, None);
        assert_eq!(streak.record_practice(day(1)), 1);
        assert_eq!(streak.record_practice(day(1)), 1);
        assert_eq!(streak.record_practice(day(2)), 2);
        assert_eq!(streak.record_practice(day(3)), 3);
    }

    #[test]
    fn gap_restarts_streak() {
        let mut streak = StreakState::new(5, Some(day(1)));
        assert_eq!(streak.record_practice(day(4)), 1);
    }

    #[test]
    fn seeded_streak_without_date_is_kept() {
        let mut streak = StreakState::new(28, None);
        assert_eq!(streak.record_practice(day(10)), 28);
        assert_eq!(streak.record_practice(day(11)), 29);
    }

    #[test]
    fn earlier_dates_do_not_decrease() {
        let mut streak = StreakState::new(3, Some(day(10)));
        assert_eq!(streak.record_practice(day(8)), 3);
        assert_eq!(streak.last_active(), Some(day(10)));
    }

    #[test]
    fn days_inactive() {
        let streak = StreakState::new(3, Some(day(10)));
        assert_eq!(streak.days_inactive(day(13)), Some(3));
        assert_eq!(StreakState::default().days_inactive(day(13)), None);
    }
}
