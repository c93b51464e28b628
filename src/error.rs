//! Error types for the ventilation controller.
//!
//! Only the messaging link and configuration loading can fail in a way the
//! caller needs to see. Everything inside the control loop is handled locally
//! and logged, so most of these variants surface at process boundaries.

use thiserror::Error;

/// Errors produced by the controller, its services, and the messaging link.
#[derive(Debug, Error)]
pub enum VentError {
    /// Failed to establish the broker connection.
    #[error("MQTT connect failed: {0}")]
    Connect(String),
    /// Failed to subscribe to a topic.
    #[error("MQTT subscribe failed: {0}")]
    Subscribe(String),
    /// Failed to unsubscribe from a topic.
    #[error("MQTT unsubscribe failed: {0}")]
    Unsubscribe(String),
    /// Failed to publish a message.
    #[error("MQTT publish failed: {0}")]
    Publish(String),
    /// Failed to close the broker connection cleanly.
    #[error("MQTT disconnect failed: {0}")]
    Disconnect(String),
    /// The link is not connected.
    #[error("messaging link is not connected")]
    NotConnected,
    /// Telemetry interval outside the accepted range.
    #[error("telemetry interval must be between {min} and {max} seconds, got {got}")]
    InvalidInterval {
        /// Value that was rejected.
        got: u64,
        /// Smallest accepted value.
        min: u64,
        /// Largest accepted value.
        max: u64,
    },
    /// Hysteresis band was negative.
    #[error("hysteresis band must be non-negative, got {0}")]
    InvalidBand(i64),
    /// A component was started twice.
    #[error("{0} is already running")]
    AlreadyRunning(&'static str),
    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
    /// I/O failure (reading config files, stdin).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, VentError>;
