//! # SmartLid Core Library
//!
//! Business logic for the SmartLid toilet-lid reminder. The appliance watches
//! a reed switch, counts down while the lid stays up, and escalates through
//! two stages: a local nudge (sound + servo push) and, once the daily
//! threshold is reached, a LINE push message.
//!
//! ## Architecture
//!
//! - **Alert Engine**: a single task owning the countdown, the daily counter
//!   and the escalation decision. Sensor edges and timer expiries reach it as
//!   commands on one channel, so its state is never touched concurrently.
//! - **Responder**: a worker that runs the blocking sound/servo choreography
//!   and the notification for each escalation, one at a time.
//! - **Hardware**: collaborator traits with Raspberry Pi (`rpi` feature),
//!   audio (`audio` feature) and simulated implementations.
//! - **Notify**: the LINE Messaging API push client.
//!
//! ## Key Components
//!
//! - [`AlertEngine`]: countdown and escalation state machine
//! - [`AlertState`]: the pure, synchronous state the engine drives
//! - [`Config`]: TOML + environment configuration
//! - [`Notifier`]: trait for remote alert channels

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod hardware;
pub mod notify;

pub use config::Config;
pub use engine::{
    AlertEngine, AlertState, Clock, Collaborators, EngineSettings, EngineSnapshot, Escalation, Stage,
    SystemClock,
};
pub use error::{ConfigError, CoreError, HardwareError, NotifyError};
pub use events::Event;
pub use hardware::{Actuator, BinarySensor, LidState, SoundPlayer};
pub use notify::{LineMessaging, Notifier};
