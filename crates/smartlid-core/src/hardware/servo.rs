//! SG90-style servo that nudges the lid down.
//!
//! The push is a fixed choreography driven by PWM duty changes:
//!
//! ```text
//! rest ─move─ stabilize ─► push ─move─ hold ─► rest ─move─► off (duty 0)
//! ```
//!
//! Timings are plain sleeps; callers run [`Servo::push`] on a blocking thread.

use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::Actuator;
use crate::config::ServoConfig;
use crate::error::HardwareError;

/// A PWM output the servo is attached to.
pub trait PwmChannel: Send {
    /// Set the duty cycle in percent (0 turns the signal off).
    fn set_duty_cycle(&mut self, percent: f64) -> Result<(), HardwareError>;

    /// Stop PWM generation entirely.
    fn stop(&mut self) -> Result<(), HardwareError>;
}

/// Duty cycles and phase durations of one push.
#[derive(Debug, Clone, PartialEq)]
pub struct ServoTiming {
    pub duty_rest: f64,
    pub duty_push: f64,
    /// Time given to the horn to reach each new angle.
    pub move_time: Duration,
    pub stabilize_time: Duration,
    pub push_hold_time: Duration,
}

impl ServoTiming {
    /// All delays zero; for tests and dry runs.
    pub fn instant(duty_rest: f64, duty_push: f64) -> Self {
        Self {
            duty_rest,
            duty_push,
            move_time: Duration::ZERO,
            stabilize_time: Duration::ZERO,
            push_hold_time: Duration::ZERO,
        }
    }

    /// Wall time of a full push.
    pub fn total(&self) -> Duration {
        self.move_time * 3 + self.stabilize_time + self.push_hold_time
    }
}

impl From<&ServoConfig> for ServoTiming {
    fn from(cfg: &ServoConfig) -> Self {
        let secs = |s: f64| Duration::from_secs_f64(s.max(0.0));
        Self {
            duty_rest: cfg.duty_rest,
            duty_push: cfg.duty_push,
            move_time: secs(cfg.move_time_secs),
            stabilize_time: secs(cfg.stabilize_time_secs),
            push_hold_time: secs(cfg.push_hold_time_secs),
        }
    }
}

pub struct Servo<P> {
    channel: Mutex<P>,
    timing: ServoTiming,
}

impl<P: PwmChannel> Servo<P> {
    pub fn new(channel: P, timing: ServoTiming) -> Self {
        info!(
            duty_rest = timing.duty_rest,
            duty_push = timing.duty_push,
            hold_secs = timing.push_hold_time.as_secs_f64(),
            "servo ready"
        );
        Self {
            channel: Mutex::new(channel),
            timing,
        }
    }

    fn change_angle(&self, channel: &mut P, duty: f64) -> Result<(), HardwareError> {
        channel.set_duty_cycle(duty)?;
        thread::sleep(self.timing.move_time);
        Ok(())
    }

    fn choreography(&self, channel: &mut P) -> Result<(), HardwareError> {
        self.change_angle(channel, self.timing.duty_rest)?;
        thread::sleep(self.timing.stabilize_time);

        debug!(duty = self.timing.duty_push, "servo: pushing");
        self.change_angle(channel, self.timing.duty_push)?;
        thread::sleep(self.timing.push_hold_time);

        debug!(duty = self.timing.duty_rest, "servo: returning to rest");
        self.change_angle(channel, self.timing.duty_rest)?;

        channel.set_duty_cycle(0.0)
    }
}

impl<P: PwmChannel> Actuator for Servo<P> {
    fn push(&self) -> Result<(), HardwareError> {
        let mut channel = self
            .channel
            .lock()
            .map_err(|_| HardwareError::unavailable("servo", "channel lock poisoned"))?;

        info!("servo: push started");
        let result = self.choreography(&mut channel);
        match &result {
            Ok(()) => info!("servo: push complete"),
            Err(e) => {
                // Leave the horn unpowered rather than mid-stroke.
                if let Err(stop_err) = channel.stop() {
                    warn!("servo: stop after failure also failed: {stop_err}");
                }
                warn!("servo: push aborted: {e}");
            }
        }
        result
    }

    fn release(&self) {
        match self.channel.lock() {
            Ok(mut channel) => {
                if let Err(e) = channel.stop() {
                    warn!("servo: release failed: {e}");
                } else {
                    info!("servo released");
                }
            }
            Err(_) => warn!("servo: release skipped, channel lock poisoned"),
        }
    }
}
