//! Core error types for smartlid-core.
//!
//! This module defines the error hierarchy using thiserror. Hardware and
//! configuration errors are fatal at startup; notification errors are only
//! ever logged by the engine.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for smartlid-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Hardware collaborator errors
    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    /// Remote notification errors
    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Missing required configuration key
    #[error("Missing required configuration key: {0}")]
    MissingKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Errors raised by the sensor, actuator and sound collaborators.
#[derive(Error, Debug)]
pub enum HardwareError {
    /// A device could not be acquired or is no longer usable
    #[error("{device} unavailable: {message}")]
    Unavailable { device: String, message: String },

    /// GPIO access failed
    #[error("GPIO error: {0}")]
    Gpio(String),

    /// Audio output or decoding failed
    #[error("Audio error: {0}")]
    Audio(String),

    /// Sound asset does not exist
    #[error("Sound file not found: {0}")]
    SoundNotFound(PathBuf),

    /// Backend was not compiled into this binary
    #[error("Unsupported backend: {0}")]
    Unsupported(String),
}

/// Errors raised while delivering a remote notification.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Channel was constructed without credentials
    #[error("Notification channel disabled: credentials not configured")]
    Disabled,

    /// Remote API answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Request did not complete in time
    #[error("Request timed out after {secs} seconds")]
    Timeout { secs: u64 },

    /// Connection or protocol failure
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// HTTP client could not be built
    #[error("Client error: {0}")]
    Client(String),
}

impl HardwareError {
    pub fn unavailable(device: impl Into<String>, message: impl ToString) -> Self {
        HardwareError::Unavailable {
            device: device.into(),
            message: message.to_string(),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
