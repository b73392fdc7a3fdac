pub mod check;
pub mod config;
pub mod run;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use smartlid_core::config::Backend;
use smartlid_core::hardware::simulated::{SimulatedPwm, SimulatedSensor};
use smartlid_core::hardware::{Servo, ServoTiming};
use smartlid_core::{
    Actuator, BinarySensor, Config, ConfigError, HardwareError, LidState, SoundPlayer,
};

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit.map_or_else(Config::default_path, Path::to_path_buf)
}

/// File config with the environment overlaid, validated.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = Config::load_from(&config_path(explicit))?;
    config.apply_process_env()?;
    config.validate()?;
    Ok(config)
}

/// Sensor, actuator and player for one backend.
pub struct Hardware {
    pub sensor: Arc<dyn BinarySensor>,
    pub actuator: Arc<dyn Actuator>,
    pub player: Arc<dyn SoundPlayer>,
    /// Handle for driving the sensor from the console in simulated mode.
    pub simulated: Option<SimulatedSensor>,
}

impl Hardware {
    pub fn open(config: &Config, backend: Backend) -> Result<Self, HardwareError> {
        let (sensor, simulated) = match backend {
            Backend::Simulated => {
                let handle = SimulatedSensor::new(LidState::Closed);
                let sensor: Arc<dyn BinarySensor> = Arc::new(handle.clone());
                (sensor, Some(handle))
            }
            Backend::Rpi => (open_rpi_sensor(config)?, None),
        };

        let actuator = match open_actuator(config, backend) {
            Ok(actuator) => actuator,
            Err(e) => {
                sensor.release();
                return Err(e);
            }
        };
        let player = match open_player() {
            Ok(player) => player,
            Err(e) => {
                sensor.release();
                actuator.release();
                return Err(e);
            }
        };

        Ok(Self {
            sensor,
            actuator,
            player,
            simulated,
        })
    }

    pub fn release(&self) {
        self.sensor.release();
        self.actuator.release();
        self.player.release();
    }
}

pub fn open_actuator(config: &Config, backend: Backend) -> Result<Arc<dyn Actuator>, HardwareError> {
    let timing = ServoTiming::from(&config.servo);
    match backend {
        Backend::Simulated => Ok(Arc::new(Servo::new(SimulatedPwm::new(), timing))),
        Backend::Rpi => open_rpi_servo(config, timing),
    }
}

#[cfg(feature = "audio")]
pub fn open_player() -> Result<Arc<dyn SoundPlayer>, HardwareError> {
    Ok(Arc::new(smartlid_core::hardware::audio::RodioPlayer::new()?))
}

#[cfg(not(feature = "audio"))]
pub fn open_player() -> Result<Arc<dyn SoundPlayer>, HardwareError> {
    Ok(Arc::new(smartlid_core::hardware::simulated::SilentPlayer))
}

#[cfg(feature = "rpi")]
fn open_rpi_sensor(config: &Config) -> Result<Arc<dyn BinarySensor>, HardwareError> {
    Ok(Arc::new(smartlid_core::hardware::rpi::RpiReedSwitch::new(config.sensor.pin)?))
}

#[cfg(feature = "rpi")]
fn open_rpi_servo(config: &Config, timing: ServoTiming) -> Result<Arc<dyn Actuator>, HardwareError> {
    let pwm = smartlid_core::hardware::rpi::RpiPwm::new(config.servo.pin, config.servo.frequency_hz)?;
    Ok(Arc::new(Servo::new(pwm, timing)))
}

#[cfg(not(feature = "rpi"))]
fn open_rpi_sensor(_config: &Config) -> Result<Arc<dyn BinarySensor>, HardwareError> {
    Err(rpi_unsupported())
}

#[cfg(not(feature = "rpi"))]
fn open_rpi_servo(_config: &Config, _timing: ServoTiming) -> Result<Arc<dyn Actuator>, HardwareError> {
    Err(rpi_unsupported())
}

#[cfg(not(feature = "rpi"))]
fn rpi_unsupported() -> HardwareError {
    HardwareError::Unsupported(
        "built without the `rpi` feature; use --simulate or hardware.backend = \"simulated\"".into(),
    )
}
