use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::Stage;
use crate::hardware::LidState;

/// Every state change in the engine produces an Event.
/// The daemon logs them; tests and the CLI subscribe to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// Engine task is running and subscribed to the sensor.
    EngineStarted {
        lid: LidState,
        at: DateTime<Utc>,
    },
    CountdownStarted {
        generation: u64,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    /// Lid closed before the deadline.
    CountdownCancelled {
        generation: u64,
        at: DateTime<Utc>,
    },
    CountdownExpired {
        generation: u64,
        at: DateTime<Utc>,
    },
    /// Countdown expired but the lid read closed at check time.
    CheckSkipped {
        generation: u64,
        at: DateTime<Utc>,
    },
    /// First escalation of a new date zeroed the counter.
    DailyCounterReset {
        previous_date: NaiveDate,
        previous_count: u32,
        date: NaiveDate,
        at: DateTime<Utc>,
    },
    EscalationTriggered {
        stage: Stage,
        daily_count: u32,
        at: DateTime<Utc>,
    },
    /// Responder finished the side effects of one escalation.
    EscalationCompleted {
        stage: Stage,
        daily_count: u32,
        sound_played: bool,
        actuated: bool,
        /// `None` when the stage does not notify.
        notified: Option<bool>,
        at: DateTime<Utc>,
    },
    /// Responder tried to report the finished day's total.
    DailySummarySent {
        date: NaiveDate,
        total_count: u32,
        delivered: bool,
        at: DateTime<Utc>,
    },
    EngineStopped {
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Short label for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::EngineStarted { .. } => "engine_started",
            Event::CountdownStarted { .. } => "countdown_started",
            Event::CountdownCancelled { .. } => "countdown_cancelled",
            Event::CountdownExpired { .. } => "countdown_expired",
            Event::CheckSkipped { .. } => "check_skipped",
            Event::DailyCounterReset { .. } => "daily_counter_reset",
            Event::EscalationTriggered { .. } => "escalation_triggered",
            Event::EscalationCompleted { .. } => "escalation_completed",
            Event::DailySummarySent { .. } => "daily_summary_sent",
            Event::EngineStopped { .. } => "engine_stopped",
        }
    }
}
