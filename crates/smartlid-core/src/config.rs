//! TOML-based appliance configuration.
//!
//! Stores everything the daemon needs to start:
//! - Countdown length and daily escalation threshold
//! - Reed switch and servo GPIO pins, PWM duty cycles and phase timings
//! - Sound assets for each escalation stage
//! - LINE Messaging API credentials
//!
//! Configuration is stored at `~/.config/smartlid/config.toml` (or the path in
//! `SMARTLID_CONFIG`). Environment variables override file values so that a
//! `.env` file next to the appliance keeps working.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Default LINE push endpoint.
pub const LINE_PUSH_ENDPOINT: &str = "https://api.line.me/v2/bot/message/push";

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "SMARTLID_CONFIG";

/// Environment overrides: variable name -> dot-path config key.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("LID_OPEN_TIMEOUT", "alert.lid_open_timeout_secs"),
    ("DAILY_ALERT_THRESHOLD", "alert.daily_alert_threshold"),
    ("REED_SWITCH_PIN", "sensor.pin"),
    ("SERVO_PIN", "servo.pin"),
    ("SERVO_FREQUENCY", "servo.frequency_hz"),
    ("SERVO_DUTY_REST", "servo.duty_rest"),
    ("SERVO_DUTY_PUSH", "servo.duty_push"),
    ("SERVO_MOVE_TIME", "servo.move_time_secs"),
    ("SERVO_STABILIZE_TIME", "servo.stabilize_time_secs"),
    ("SERVO_PUSH_HOLD_TIME", "servo.push_hold_time_secs"),
    ("ALERT1_SOUND", "sounds.alert1"),
    ("ALERT2_SOUND", "sounds.alert2"),
    ("LINE_CHANNEL_ACCESS_TOKEN", "line.channel_access_token"),
    ("LINE_USER_ID", "line.user_id"),
    ("LINE_ENDPOINT", "line.endpoint"),
    ("LINE_TIMEOUT", "line.timeout_secs"),
    ("LINE_MESSAGE_STYLE", "line.message_style"),
    ("LINE_DAILY_SUMMARY", "line.daily_summary"),
    ("SMARTLID_BACKEND", "hardware.backend"),
];

/// Countdown and escalation policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    #[serde(default = "default_lid_open_timeout")]
    pub lid_open_timeout_secs: u64,
    /// Escalations per day below this count stay at stage 1.
    #[serde(default = "default_daily_alert_threshold")]
    pub daily_alert_threshold: u32,
}

/// Reed switch input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// BCM pin number.
    #[serde(default = "default_sensor_pin")]
    pub pin: u8,
}

/// Servo PWM output and push choreography.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServoConfig {
    /// BCM pin number.
    #[serde(default = "default_servo_pin")]
    pub pin: u8,
    #[serde(default = "default_frequency")]
    pub frequency_hz: f64,
    /// Duty cycle (percent) of the rest position.
    #[serde(default = "default_duty_rest")]
    pub duty_rest: f64,
    /// Duty cycle (percent) of the push position.
    #[serde(default = "default_duty_push")]
    pub duty_push: f64,
    #[serde(default = "default_move_time")]
    pub move_time_secs: f64,
    #[serde(default = "default_stabilize_time")]
    pub stabilize_time_secs: f64,
    #[serde(default = "default_push_hold_time")]
    pub push_hold_time_secs: f64,
}

/// Sound assets per escalation stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoundConfig {
    /// Stage 1 ("mild") reminder.
    #[serde(default = "default_alert1_sound")]
    pub alert1: PathBuf,
    /// Stage 2 ("severe") warning.
    #[serde(default = "default_alert2_sound")]
    pub alert2: PathBuf,
}

/// LINE Messaging API push settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineConfig {
    #[serde(default)]
    pub channel_access_token: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default = "default_line_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_line_timeout")]
    pub timeout_secs: u64,
    /// Message body; `{count}` and `{date}` are substituted.
    #[serde(default = "default_message_template")]
    pub message_template: String,
    /// Plain text or a Flex bubble for alerts.
    #[serde(default)]
    pub message_style: MessageStyle,
    /// Push the previous day's report when the counter rolls over.
    #[serde(default)]
    pub daily_summary: bool,
}

/// How stage 2 alerts are rendered on LINE.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStyle {
    #[default]
    Text,
    Flex,
}

/// Which hardware adapters the daemon wires up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Raspberry Pi GPIO (requires the `rpi` feature).
    Rpi,
    /// In-memory sensor and servo driven from stdin.
    Simulated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareConfig {
    #[serde(default = "default_backend")]
    pub backend: Backend,
}

/// Appliance configuration.
///
/// Serialized to/from TOML at `~/.config/smartlid/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub alert: AlertConfig,
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub servo: ServoConfig,
    #[serde(default)]
    pub sounds: SoundConfig,
    #[serde(default)]
    pub line: LineConfig,
    #[serde(default)]
    pub hardware: HardwareConfig,
}

// Default functions
fn default_lid_open_timeout() -> u64 {
    60
}
fn default_daily_alert_threshold() -> u32 {
    2
}
fn default_sensor_pin() -> u8 {
    17
}
fn default_servo_pin() -> u8 {
    18
}
fn default_frequency() -> f64 {
    50.0
}
fn default_duty_rest() -> f64 {
    3.3
}
fn default_duty_push() -> f64 {
    8.1
}
fn default_move_time() -> f64 {
    0.5
}
fn default_stabilize_time() -> f64 {
    0.1
}
fn default_push_hold_time() -> f64 {
    2.0
}
fn default_alert1_sound() -> PathBuf {
    PathBuf::from("data/sounds/alert1.mp3")
}
fn default_alert2_sound() -> PathBuf {
    PathBuf::from("data/sounds/alert2.mp3")
}
fn default_line_endpoint() -> String {
    LINE_PUSH_ENDPOINT.into()
}
fn default_line_timeout() -> u64 {
    10
}
fn default_message_template() -> String {
    "SmartLid reminder\n\nThe toilet lid was left up {count} times today ({date}).\nPlease remember to put it down!".into()
}
fn default_backend() -> Backend {
    Backend::Rpi
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            lid_open_timeout_secs: default_lid_open_timeout(),
            daily_alert_threshold: default_daily_alert_threshold(),
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            pin: default_sensor_pin(),
        }
    }
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            pin: default_servo_pin(),
            frequency_hz: default_frequency(),
            duty_rest: default_duty_rest(),
            duty_push: default_duty_push(),
            move_time_secs: default_move_time(),
            stabilize_time_secs: default_stabilize_time(),
            push_hold_time_secs: default_push_hold_time(),
        }
    }
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            alert1: default_alert1_sound(),
            alert2: default_alert2_sound(),
        }
    }
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            channel_access_token: String::new(),
            user_id: String::new(),
            endpoint: default_line_endpoint(),
            timeout_secs: default_line_timeout(),
            message_template: default_message_template(),
            message_style: MessageStyle::Text,
            daily_summary: false,
        }
    }
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
        }
    }
}

impl AlertConfig {
    pub fn lid_open_timeout(&self) -> Duration {
        Duration::from_secs(self.lid_open_timeout_secs)
    }
}

impl LineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Whether both credentials are present.
    pub fn has_credentials(&self) -> bool {
        !self.channel_access_token.trim().is_empty() && !self.user_id.trim().is_empty()
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::MissingKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(invalid("not a leaf value".into()));
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Returns `$SMARTLID_CONFIG` or `~/.config/smartlid/config.toml`.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("smartlid")
            .join("config.toml")
    }

    /// Load from `path`, returning defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Load from the default path.
    ///
    /// # Errors
    ///
    /// See [`Config::load_from`].
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path())
    }

    /// Persist to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Overlay environment variables using `lookup` (normally `std::env::var`).
    ///
    /// # Errors
    ///
    /// Returns an error naming the variable whose value does not fit its key.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        for (var, key) in ENV_OVERRIDES {
            if let Some(value) = lookup(var) {
                self.set_value(key, value.trim()).map_err(|e| match e {
                    ConfigError::InvalidValue { message, .. } => ConfigError::InvalidValue {
                        key: (*var).to_string(),
                        message,
                    },
                    other => other,
                })?;
            }
        }
        Ok(())
    }

    /// Overlay the process environment.
    ///
    /// # Errors
    ///
    /// See [`Config::apply_env`].
    pub fn apply_process_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env(|var| std::env::var(var).ok())
    }

    /// Check ranges the daemon relies on.
    ///
    /// # Errors
    ///
    /// Returns the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| {
            Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: message.to_string(),
            })
        };

        if self.alert.lid_open_timeout_secs == 0 {
            return invalid("alert.lid_open_timeout_secs", "must be at least 1 second");
        }
        if self.alert.daily_alert_threshold == 0 {
            return invalid("alert.daily_alert_threshold", "must be at least 1");
        }
        if !(self.servo.frequency_hz.is_finite() && self.servo.frequency_hz > 0.0) {
            return invalid("servo.frequency_hz", "must be positive");
        }
        for (key, duty) in [
            ("servo.duty_rest", self.servo.duty_rest),
            ("servo.duty_push", self.servo.duty_push),
        ] {
            if !(0.0..=100.0).contains(&duty) {
                return invalid(key, "duty cycle must be between 0 and 100 percent");
            }
        }
        for (key, secs) in [
            ("servo.move_time_secs", self.servo.move_time_secs),
            ("servo.stabilize_time_secs", self.servo.stabilize_time_secs),
            ("servo.push_hold_time_secs", self.servo.push_hold_time_secs),
        ] {
            if !(secs.is_finite() && secs >= 0.0) {
                return invalid(key, "must be a non-negative number of seconds");
            }
        }
        if self.line.timeout_secs == 0 {
            return invalid("line.timeout_secs", "must be at least 1 second");
        }
        match url::Url::parse(&self.line.endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(_) => return invalid("line.endpoint", "must be an http(s) URL"),
            Err(e) => return invalid("line.endpoint", &e.to_string()),
        }
        Ok(())
    }

    /// Copy with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.line.channel_access_token.is_empty() {
            copy.line.channel_access_token = "***".into();
        }
        copy
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value in memory by dot-separated key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self)
            .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }
}
