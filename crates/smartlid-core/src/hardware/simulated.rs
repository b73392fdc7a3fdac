//! In-memory collaborators for tests and `smartlid run --simulate`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::info;

use super::{Actuator, BinarySensor, EdgeHandler, LidState, PwmChannel, SoundPlayer};
use crate::error::HardwareError;

type SharedHandler = Arc<dyn Fn() + Send + Sync + 'static>;

fn lock<'a, T>(mutex: &'a Mutex<T>, device: &str) -> Result<MutexGuard<'a, T>, HardwareError> {
    mutex
        .lock()
        .map_err(|_| HardwareError::unavailable(device, "state lock poisoned"))
}

#[derive(Default)]
struct SensorInner {
    state: Option<LidState>,
    rising: Option<SharedHandler>,
    falling: Option<SharedHandler>,
    fail_reads: bool,
    released: bool,
}

/// Sensor whose value is set by the caller. Edges fire synchronously from
/// [`SimulatedSensor::set`].
#[derive(Clone, Default)]
pub struct SimulatedSensor {
    inner: Arc<Mutex<SensorInner>>,
}

impl SimulatedSensor {
    pub fn new(initial: LidState) -> Self {
        let sensor = Self::default();
        if let Ok(mut inner) = sensor.inner.lock() {
            inner.state = Some(initial);
        }
        sensor
    }

    /// Change the value, firing the matching edge handler if it changed.
    pub fn set(&self, state: LidState) {
        let handler = {
            let Ok(mut inner) = self.inner.lock() else {
                return;
            };
            let previous = inner.state.replace(state);
            if previous == Some(state) || inner.released {
                None
            } else if state.is_open() {
                inner.rising.clone()
            } else {
                inner.falling.clone()
            }
        };
        if let Some(handler) = handler {
            handler();
        }
    }

    /// Change the value without delivering an edge.
    pub fn set_silently(&self, state: LidState) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.state = Some(state);
        }
    }

    /// Make subsequent reads fail.
    pub fn fail_reads(&self, fail: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_reads = fail;
        }
    }

    pub fn is_released(&self) -> bool {
        self.inner.lock().map(|i| i.released).unwrap_or(false)
    }
}

impl BinarySensor for SimulatedSensor {
    fn read(&self) -> Result<LidState, HardwareError> {
        let inner = lock(&self.inner, "simulated sensor")?;
        if inner.fail_reads {
            return Err(HardwareError::Gpio("simulated read failure".into()));
        }
        Ok(inner.state.unwrap_or(LidState::Closed))
    }

    fn on_rising(&self, handler: EdgeHandler) -> Result<(), HardwareError> {
        lock(&self.inner, "simulated sensor")?.rising = Some(Arc::from(handler));
        Ok(())
    }

    fn on_falling(&self, handler: EdgeHandler) -> Result<(), HardwareError> {
        lock(&self.inner, "simulated sensor")?.falling = Some(Arc::from(handler));
        Ok(())
    }

    fn release(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.rising = None;
            inner.falling = None;
            inner.released = true;
        }
        info!("simulated sensor released");
    }
}

#[derive(Default)]
struct PwmInner {
    history: Vec<f64>,
    fail_after: Option<usize>,
    stopped: bool,
}

/// PWM output that records every duty change.
#[derive(Clone, Default)]
pub struct SimulatedPwm {
    inner: Arc<Mutex<PwmInner>>,
}

impl SimulatedPwm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn duty_history(&self) -> Vec<f64> {
        self.inner
            .lock()
            .map(|i| i.history.clone())
            .unwrap_or_default()
    }

    /// Fail every duty change after the first `n`.
    pub fn fail_after(&self, n: usize) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_after = Some(n);
        }
    }

    pub fn stopped(&self) -> bool {
        self.inner.lock().map(|i| i.stopped).unwrap_or(false)
    }
}

impl PwmChannel for SimulatedPwm {
    fn set_duty_cycle(&mut self, percent: f64) -> Result<(), HardwareError> {
        let mut inner = lock(&self.inner, "simulated pwm")?;
        if inner.fail_after.is_some_and(|n| inner.history.len() >= n) {
            return Err(HardwareError::Gpio("simulated pwm failure".into()));
        }
        inner.history.push(percent);
        inner.stopped = false;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), HardwareError> {
        lock(&self.inner, "simulated pwm")?.stopped = true;
        Ok(())
    }
}

/// Actuator that counts pushes.
#[derive(Default)]
pub struct SimulatedActuator {
    pushes: AtomicUsize,
    fail: AtomicBool,
    released: AtomicBool,
}

impl SimulatedActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_count(&self) -> usize {
        self.pushes.load(Ordering::SeqCst)
    }

    /// Make every push fail (the attempt is still counted).
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

impl Actuator for SimulatedActuator {
    fn push(&self) -> Result<(), HardwareError> {
        self.pushes.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(HardwareError::unavailable("simulated actuator", "jammed"));
        }
        Ok(())
    }

    fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// Player that records what it was asked to play.
#[derive(Default)]
pub struct SimulatedPlayer {
    played: Mutex<Vec<PathBuf>>,
    fail: AtomicBool,
    released: AtomicBool,
}

impl SimulatedPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> Vec<PathBuf> {
        self.played.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

impl SoundPlayer for SimulatedPlayer {
    fn play(&self, path: &Path) -> Result<(), HardwareError> {
        lock(&self.played, "simulated player")?.push(path.to_path_buf());
        if self.fail.load(Ordering::SeqCst) {
            return Err(HardwareError::SoundNotFound(path.to_path_buf()));
        }
        Ok(())
    }

    fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// Player for builds without audio output: logs and returns.
#[derive(Debug, Default)]
pub struct SilentPlayer;

impl SoundPlayer for SilentPlayer {
    fn play(&self, path: &Path) -> Result<(), HardwareError> {
        info!(path = %path.display(), "sound (silent): would play");
        Ok(())
    }

    fn release(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_fires_only_on_change() {
        let sensor = SimulatedSensor::new(LidState::Closed);
        let rises = Arc::new(AtomicUsize::new(0));
        let falls = Arc::new(AtomicUsize::new(0));

        let r = rises.clone();
        sensor
            .on_rising(Box::new(move || {
                r.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        let f = falls.clone();
        sensor
            .on_falling(Box::new(move || {
                f.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();

        sensor.set(LidState::Open);
        sensor.set(LidState::Open);
        sensor.set(LidState::Closed);
        sensor.set_silently(LidState::Open);

        assert_eq!(rises.load(Ordering::SeqCst), 1);
        assert_eq!(falls.load(Ordering::SeqCst), 1);
        assert_eq!(sensor.read().unwrap(), LidState::Open);
    }

    #[test]
    fn released_sensor_stops_delivering_edges() {
        let sensor = SimulatedSensor::new(LidState::Closed);
        let rises = Arc::new(AtomicUsize::new(0));
        let r = rises.clone();
        sensor
            .on_rising(Box::new(move || {
                r.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();

        sensor.release();
        sensor.set(LidState::Open);

        assert_eq!(rises.load(Ordering::SeqCst), 0);
        assert!(sensor.is_released());
    }

    #[test]
    fn failing_reads_surface_as_errors() {
        let sensor = SimulatedSensor::new(LidState::Open);
        sensor.fail_reads(true);
        assert!(sensor.read().is_err());
    }

    #[test]
    fn actuator_counts_failed_attempts() {
        let actuator = SimulatedActuator::new();
        actuator.set_failing(true);
        assert!(actuator.push().is_err());
        assert_eq!(actuator.push_count(), 1);
    }
}
