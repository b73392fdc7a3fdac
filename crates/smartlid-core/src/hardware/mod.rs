//! Hardware collaborators.
//!
//! The engine only sees these traits. Each device is a single physical
//! instance, so implementations serialize access internally and every method
//! takes `&self`.

mod servo;
pub mod simulated;

#[cfg(feature = "audio")]
pub mod audio;
#[cfg(feature = "rpi")]
pub mod rpi;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::HardwareError;

pub use servo::{PwmChannel, Servo, ServoTiming};

/// Reed switch reading. Magnet near = closed (level 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LidState {
    Closed,
    Open,
}

impl LidState {
    /// Map a raw input level (0 or 1).
    pub fn from_level(level: u8) -> Self {
        if level == 0 {
            LidState::Closed
        } else {
            LidState::Open
        }
    }

    pub fn level(self) -> u8 {
        match self {
            LidState::Closed => 0,
            LidState::Open => 1,
        }
    }

    pub fn is_open(self) -> bool {
        self == LidState::Open
    }
}

/// Callback invoked on a sensor edge. May run on an interrupt thread.
pub type EdgeHandler = Box<dyn Fn() + Send + Sync + 'static>;

/// Binary lid sensor with edge subscriptions.
pub trait BinarySensor: Send + Sync {
    /// Current value.
    fn read(&self) -> Result<LidState, HardwareError>;

    /// Register the closed -> open handler, replacing any previous one.
    fn on_rising(&self, handler: EdgeHandler) -> Result<(), HardwareError>;

    /// Register the open -> closed handler, replacing any previous one.
    fn on_falling(&self, handler: EdgeHandler) -> Result<(), HardwareError>;

    /// Stop delivering edges and free the input.
    fn release(&self);
}

/// One-shot physical push. Blocks for the whole choreography.
pub trait Actuator: Send + Sync {
    fn push(&self) -> Result<(), HardwareError>;

    fn release(&self);
}

/// Blocking sound playback.
pub trait SoundPlayer: Send + Sync {
    /// Play `path` to completion.
    fn play(&self, path: &Path) -> Result<(), HardwareError>;

    fn release(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lid_state_levels() {
        assert_eq!(LidState::from_level(0), LidState::Closed);
        assert_eq!(LidState::from_level(1), LidState::Open);
        assert_eq!(LidState::Open.level(), 1);
        assert!(!LidState::Closed.is_open());
    }
}
