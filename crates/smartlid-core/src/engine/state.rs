//! Alert state machine.
//!
//! Pure, synchronous state owned by the engine task. It knows nothing about
//! timers or hardware: the engine arms a real timer when [`AlertState::arm`]
//! hands out a generation, and feeds the expiry back through
//! [`AlertState::expire`].
//!
//! ## State Transitions
//!
//! ```text
//!            arm()                  expire(live generation)
//!   Idle ───────────► Counting ─────────────────────────────► Idle
//!    ▲                   │
//!    └──── cancel() ─────┘
//! ```
//!
//! Arming while counting and cancelling while idle are no-ops. An expiry with
//! a generation other than the live one (a timer that fired after being
//! cancelled) is ignored.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::escalation::{Escalation, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum Countdown {
    Idle,
    Counting { generation: u64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertState {
    countdown: Countdown,
    /// Last generation handed out.
    generation: u64,
    daily_count: u32,
    last_reset_date: NaiveDate,
    threshold: u32,
}

impl AlertState {
    /// Fresh state: idle, zero count, counter dated `today`.
    pub fn new(threshold: u32, today: NaiveDate) -> Self {
        Self {
            countdown: Countdown::Idle,
            generation: 0,
            daily_count: 0,
            last_reset_date: today,
            threshold: threshold.max(1),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn countdown(&self) -> Countdown {
        self.countdown
    }

    pub fn is_counting(&self) -> bool {
        matches!(self.countdown, Countdown::Counting { .. })
    }

    /// Generation of the live countdown, if any.
    pub fn live_generation(&self) -> Option<u64> {
        match self.countdown {
            Countdown::Counting { generation } => Some(generation),
            Countdown::Idle => None,
        }
    }

    pub fn daily_count(&self) -> u32 {
        self.daily_count
    }

    pub fn last_reset_date(&self) -> NaiveDate {
        self.last_reset_date
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a countdown. Returns the new generation, or `None` if one is
    /// already running.
    pub fn arm(&mut self) -> Option<u64> {
        if self.is_counting() {
            return None;
        }
        self.generation += 1;
        self.countdown = Countdown::Counting {
            generation: self.generation,
        };
        Some(self.generation)
    }

    /// Cancel the running countdown. Returns its generation, or `None` if
    /// idle.
    pub fn cancel(&mut self) -> Option<u64> {
        let generation = self.live_generation()?;
        self.countdown = Countdown::Idle;
        Some(generation)
    }

    /// Resolve an expiry. Returns `true` when `generation` was live; the
    /// state is then idle and the caller runs the escalation decision.
    pub fn expire(&mut self, generation: u64) -> bool {
        if self.live_generation() != Some(generation) {
            return false;
        }
        self.countdown = Countdown::Idle;
        true
    }

    /// Commit one escalation dated `today`: roll the counter over on a new
    /// date, increment it, and pick the stage.
    pub fn record_escalation(&mut self, today: NaiveDate) -> Escalation {
        let rolled_over = self.roll_over(today);
        self.daily_count = self.daily_count.saturating_add(1);
        Escalation {
            stage: Stage::for_count(self.daily_count, self.threshold),
            daily_count: self.daily_count,
            date: today,
            rolled_over,
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn roll_over(&mut self, today: NaiveDate) -> Option<(NaiveDate, u32)> {
        if today == self.last_reset_date {
            return None;
        }
        let previous = (self.last_reset_date, self.daily_count);
        self.daily_count = 0;
        self.last_reset_date = today;
        Some(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, d).unwrap()
    }

    #[test]
    fn arm_is_idempotent() {
        let mut state = AlertState::new(2, day(1));
        assert_eq!(state.arm(), Some(1));
        assert_eq!(state.arm(), None);
        assert_eq!(state.live_generation(), Some(1));
    }

    #[test]
    fn cancel_when_idle_is_noop() {
        let mut state = AlertState::new(2, day(1));
        assert_eq!(state.cancel(), None);
        assert_eq!(state.countdown(), Countdown::Idle);
    }

    #[test]
    fn stale_expiry_is_ignored() {
        let mut state = AlertState::new(2, day(1));
        let first = state.arm().unwrap();
        state.cancel();
        let second = state.arm().unwrap();

        assert!(!state.expire(first));
        assert!(state.is_counting());
        assert!(state.expire(second));
        assert!(!state.is_counting());
        assert!(!state.expire(second));
    }

    #[test]
    fn escalations_climb_to_severe() {
        let mut state = AlertState::new(2, day(1));
        let first = state.record_escalation(day(1));
        let second = state.record_escalation(day(1));
        let third = state.record_escalation(day(1));

        assert_eq!((first.stage, first.daily_count), (Stage::Mild, 1));
        assert_eq!((second.stage, second.daily_count), (Stage::Severe, 2));
        assert_eq!((third.stage, third.daily_count), (Stage::Severe, 3));
        assert!(first.rolled_over.is_none());
    }

    #[test]
    fn new_date_resets_before_increment() {
        let mut state = AlertState::new(2, day(1));
        state.record_escalation(day(1));
        state.record_escalation(day(1));
        state.record_escalation(day(1));

        let next = state.record_escalation(day(2));
        assert_eq!(next.daily_count, 1);
        assert_eq!(next.stage, Stage::Mild);
        assert_eq!(next.rolled_over, Some((day(1), 3)));
        assert_eq!(state.last_reset_date(), day(2));
    }

    #[test]
    fn zero_threshold_is_clamped() {
        let state = AlertState::new(0, day(1));
        assert_eq!(state.threshold(), 1);
    }
}
