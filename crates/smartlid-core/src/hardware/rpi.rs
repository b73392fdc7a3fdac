//! Raspberry Pi adapters built on `rppal`.
//!
//! - [`RpiReedSwitch`]: reed switch on a BCM input pin, both edges delivered
//!   through rppal's async interrupt thread.
//! - [`RpiPwm`]: software PWM on a BCM output pin driving the servo.

use std::sync::{Arc, Mutex};

use rppal::gpio::{Event, Gpio, InputPin, Level, OutputPin, Trigger};
use tracing::{debug, info, warn};

use super::{BinarySensor, EdgeHandler, LidState, PwmChannel};
use crate::error::HardwareError;

fn gpio_err(e: rppal::gpio::Error) -> HardwareError {
    HardwareError::Gpio(e.to_string())
}

#[derive(Default)]
struct Handlers {
    rising: Option<EdgeHandler>,
    falling: Option<EdgeHandler>,
}

pub struct RpiReedSwitch {
    pin: Mutex<InputPin>,
    handlers: Arc<Mutex<Handlers>>,
    bcm: u8,
}

impl RpiReedSwitch {
    /// Claim `bcm` as a pulled-down input and start listening for edges.
    ///
    /// # Errors
    ///
    /// Fails when GPIO is not accessible or the pin is in use.
    pub fn new(bcm: u8) -> Result<Self, HardwareError> {
        let mut pin = Gpio::new()
            .and_then(|gpio| gpio.get(bcm))
            .map_err(|e| HardwareError::unavailable("reed switch", e))?
            .into_input_pulldown();

        let handlers: Arc<Mutex<Handlers>> = Arc::default();
        let dispatch = Arc::clone(&handlers);
        pin.set_async_interrupt(Trigger::Both, None, move |event: Event| {
            let Ok(handlers) = dispatch.lock() else {
                return;
            };
            let handler = match event.trigger {
                Trigger::RisingEdge => handlers.rising.as_ref(),
                Trigger::FallingEdge => handlers.falling.as_ref(),
                _ => None,
            };
            if let Some(handler) = handler {
                handler();
            }
        })
        .map_err(gpio_err)?;

        info!(pin = bcm, "reed switch ready");
        Ok(Self {
            pin: Mutex::new(pin),
            handlers,
            bcm,
        })
    }

    fn handlers(&self) -> Result<std::sync::MutexGuard<'_, Handlers>, HardwareError> {
        self.handlers
            .lock()
            .map_err(|_| HardwareError::unavailable("reed switch", "handler lock poisoned"))
    }
}

impl BinarySensor for RpiReedSwitch {
    fn read(&self) -> Result<LidState, HardwareError> {
        let pin = self
            .pin
            .lock()
            .map_err(|_| HardwareError::unavailable("reed switch", "pin lock poisoned"))?;
        Ok(match pin.read() {
            Level::Low => LidState::Closed,
            Level::High => LidState::Open,
        })
    }

    fn on_rising(&self, handler: EdgeHandler) -> Result<(), HardwareError> {
        self.handlers()?.rising = Some(handler);
        Ok(())
    }

    fn on_falling(&self, handler: EdgeHandler) -> Result<(), HardwareError> {
        self.handlers()?.falling = Some(handler);
        Ok(())
    }

    fn release(&self) {
        if let Ok(mut pin) = self.pin.lock() {
            if let Err(e) = pin.clear_async_interrupt() {
                warn!(pin = self.bcm, "reed switch: clearing interrupt failed: {e}");
            }
        }
        if let Ok(mut handlers) = self.handlers.lock() {
            *handlers = Handlers::default();
        }
        info!(pin = self.bcm, "reed switch released");
    }
}

/// Software PWM output.
pub struct RpiPwm {
    pin: OutputPin,
    frequency_hz: f64,
}

impl RpiPwm {
    /// Claim `bcm` as an output, signal off.
    ///
    /// # Errors
    ///
    /// Fails when GPIO is not accessible or the pin is in use.
    pub fn new(bcm: u8, frequency_hz: f64) -> Result<Self, HardwareError> {
        let mut pin = Gpio::new()
            .and_then(|gpio| gpio.get(bcm))
            .map_err(|e| HardwareError::unavailable("servo", e))?
            .into_output_low();
        pin.set_pwm_frequency(frequency_hz, 0.0).map_err(gpio_err)?;
        info!(pin = bcm, frequency_hz, "servo pwm ready");
        Ok(Self { pin, frequency_hz })
    }
}

impl PwmChannel for RpiPwm {
    fn set_duty_cycle(&mut self, percent: f64) -> Result<(), HardwareError> {
        debug!(percent, "pwm duty");
        self.pin
            .set_pwm_frequency(self.frequency_hz, (percent / 100.0).clamp(0.0, 1.0))
            .map_err(gpio_err)
    }

    fn stop(&mut self) -> Result<(), HardwareError> {
        self.pin.clear_pwm().map_err(gpio_err)?;
        self.pin.set_low();
        Ok(())
    }
}
