//! Countdown, daily counter and escalation.

mod alert_engine;
mod clock;
mod escalation;
mod responder;
mod state;

pub use alert_engine::{AlertEngine, Collaborators, EngineSettings, EngineSnapshot};
pub use clock::{Clock, ManualClock, SystemClock};
pub use escalation::{Escalation, Stage};
pub use state::{AlertState, Countdown};
