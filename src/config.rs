//! Configuration for the controller daemon and the companion console.
//!
//! Every section deserializes with defaults, so a TOML file only needs the
//! keys it wants to override.
//!
//! # Example
//!
//! ```rust
//! use smart_vent::config::{Config, ControlConfig, MqttConfig};
//!
//! // Use defaults
//! let config = Config::default();
//! assert_eq!(config.mqtt.topic("air_quality"), "ghisjlgoc/air_quality");
//!
//! // Or customize
//! let config = Config::default()
//!     .with_mqtt(MqttConfig::default().with_host("192.168.1.100"))
//!     .with_control(ControlConfig::default().with_target(900));
//! assert_eq!(config.control.target, 900);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Operator-settable range for the simulated reading.
pub const READING_RANGE: (i64, i64) = (0, 5000);

/// Operator-settable range for the hysteresis target.
pub const TARGET_RANGE: (i64, i64) = (400, 5000);

/// Operator-settable range for the hysteresis band.
pub const BAND_RANGE: (i64, i64) = (0, 400);

/// Accepted telemetry interval range in seconds.
pub const INTERVAL_RANGE_SECS: (u64, u64) = (1, 3600);

/// Topic suffix for outbound readings.
pub const AIR_QUALITY_TOPIC: &str = "air_quality";

/// Topic suffix for inbound commands.
pub const UPDATE_TOPIC: &str = "update";

// ============================================================================
// Main Config
// ============================================================================

/// Complete application configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// MQTT broker and topic configuration
    pub mqtt: MqttConfig,
    /// Control loop configuration
    pub control: ControlConfig,
    /// Telemetry publisher configuration
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a configuration file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Set MQTT configuration
    pub fn with_mqtt(mut self, mqtt: MqttConfig) -> Self {
        self.mqtt = mqtt;
        self
    }

    /// Set control configuration
    pub fn with_control(mut self, control: ControlConfig) -> Self {
        self.control = control;
        self
    }

    /// Set telemetry configuration
    pub fn with_telemetry(mut self, telemetry: TelemetryConfig) -> Self {
        self.telemetry = telemetry;
        self
    }
}

// ============================================================================
// MQTT Config
// ============================================================================

/// MQTT client configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker hostname or IP
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Client ID (must be unique per connected client)
    pub client_id: String,
    /// Username for authentication (empty = no auth)
    pub username: String,
    /// Password for authentication
    pub password: String,
    /// Topic prefix shared by both directions
    pub topic_prefix: String,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u16,
    /// How long `connect()` waits for the broker acknowledgement
    pub connect_timeout_ms: u64,
    /// How long `disconnect()` waits for the event loop to wind down
    pub disconnect_grace_ms: u64,
    /// Connect the messaging link as soon as the daemon starts
    pub connect_on_start: bool,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "test.mosquitto.org".to_string(),
            port: 1884,
            client_id: "smart-vent".to_string(),
            username: "rw".to_string(),
            password: "readwrite".to_string(),
            topic_prefix: "ghisjlgoc".to_string(),
            keep_alive_secs: 30,
            connect_timeout_ms: 5000,
            disconnect_grace_ms: 250,
            connect_on_start: false,
        }
    }
}

impl MqttConfig {
    /// Set the broker host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the broker port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the client ID
    pub fn with_client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = id.into();
        self
    }

    /// Set authentication credentials
    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Set the topic prefix
    pub fn with_topic_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.topic_prefix = prefix.into();
        self
    }

    /// Connect on start
    pub fn with_connect_on_start(mut self, connect: bool) -> Self {
        self.connect_on_start = connect;
        self
    }

    /// Build a topic string with the configured prefix
    pub fn topic(&self, suffix: &str) -> String {
        format!("{}/{}", self.topic_prefix.trim_end_matches('/'), suffix)
    }

    /// Outbound reading topic.
    pub fn air_quality_topic(&self) -> String {
        self.topic(AIR_QUALITY_TOPIC)
    }

    /// Inbound command topic.
    pub fn update_topic(&self) -> String {
        self.topic(UPDATE_TOPIC)
    }

    /// Check if authentication is configured
    pub fn has_auth(&self) -> bool {
        !self.username.is_empty()
    }

    /// Connect timeout as a `Duration`.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Disconnect grace period as a `Duration`.
    pub fn disconnect_grace(&self) -> Duration {
        Duration::from_millis(self.disconnect_grace_ms)
    }
}

// ============================================================================
// Control Config
// ============================================================================

/// Which reading the fan decision is made against on each control tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationPolicy {
    /// Decide on the reading captured before the simulator step.
    ///
    /// The fan lags the sensor by one tick. This is the historical behavior.
    #[default]
    PreviousReading,
    /// Decide on the reading the simulator just produced.
    FreshReading,
}

/// Control loop configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ControlConfig {
    /// Reading the shared state is seeded with at startup
    pub initial_reading: i64,
    /// Hysteresis target (ppm)
    pub target: i64,
    /// Hysteresis half-width (ppm)
    pub band: i64,
    /// Control tick period in milliseconds
    pub tick_ms: u64,
    /// Fan evaluation ordering
    pub evaluation: EvaluationPolicy,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            initial_reading: 1050,
            target: 1100,
            band: 100,
            tick_ms: 1000,
            evaluation: EvaluationPolicy::PreviousReading,
        }
    }
}

impl ControlConfig {
    /// Set the initial reading
    pub fn with_initial_reading(mut self, reading: i64) -> Self {
        self.initial_reading = reading;
        self
    }

    /// Set the hysteresis target, clamped to [`TARGET_RANGE`]
    pub fn with_target(mut self, target: i64) -> Self {
        self.target = target.clamp(TARGET_RANGE.0, TARGET_RANGE.1);
        self
    }

    /// Set the hysteresis band, clamped to [`BAND_RANGE`]
    pub fn with_band(mut self, band: i64) -> Self {
        self.band = band.clamp(BAND_RANGE.0, BAND_RANGE.1);
        self
    }

    /// Set the tick period
    pub fn with_tick_ms(mut self, ms: u64) -> Self {
        self.tick_ms = ms.max(1);
        self
    }

    /// Set the evaluation policy
    pub fn with_evaluation(mut self, evaluation: EvaluationPolicy) -> Self {
        self.evaluation = evaluation;
        self
    }

    /// Tick period as a `Duration`.
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}

// ============================================================================
// Telemetry Config
// ============================================================================

/// Telemetry publisher configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Seconds between publishes
    pub interval_secs: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { interval_secs: 10 }
    }
}

impl TelemetryConfig {
    /// Set the publish interval, clamped to [`INTERVAL_RANGE_SECS`]
    pub fn with_interval_secs(mut self, secs: u64) -> Self {
        self.interval_secs = secs.clamp(INTERVAL_RANGE_SECS.0, INTERVAL_RANGE_SECS.1);
        self
    }

    /// Interval as a `Duration`.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.mqtt.port, 1884);
        assert_eq!(config.control.initial_reading, 1050);
        assert_eq!(config.control.target, 1100);
        assert_eq!(config.control.band, 100);
        assert_eq!(config.telemetry.interval_secs, 10);
        assert!(!config.mqtt.connect_on_start);
        assert_eq!(config.control.evaluation, EvaluationPolicy::PreviousReading);
    }

    #[test]
    fn mqtt_topic_building() {
        let mqtt = MqttConfig::default();
        assert_eq!(mqtt.air_quality_topic(), "ghisjlgoc/air_quality");
        assert_eq!(mqtt.update_topic(), "ghisjlgoc/update");

        let mqtt = MqttConfig::default().with_topic_prefix("vent/");
        assert_eq!(mqtt.topic("update"), "vent/update");
    }

    #[test]
    fn mqtt_auth_detection() {
        let with_auth = MqttConfig::default();
        assert!(with_auth.has_auth());

        let no_auth = MqttConfig::default().with_auth("", "");
        assert!(!no_auth.has_auth());
    }

    #[test]
    fn control_builders_clamp() {
        let control = ControlConfig::default().with_target(10).with_band(1000);
        assert_eq!(control.target, 400);
        assert_eq!(control.band, 400);

        let control = ControlConfig::default().with_band(-5);
        assert_eq!(control.band, 0);
    }

    #[test]
    fn telemetry_interval_clamped() {
        assert_eq!(TelemetryConfig::default().with_interval_secs(0).interval_secs, 1);
        assert_eq!(
            TelemetryConfig::default().with_interval_secs(10_000).interval_secs,
            3600
        );
        assert_eq!(
            TelemetryConfig::default().with_interval_secs(5).interval(),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [mqtt]
            host = "broker.local"
            port = 1883

            connect_on_start = true

            [control]
            evaluation = "fresh_reading"
            "#,
        )
        .unwrap();

        assert_eq!(config.mqtt.host, "broker.local");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.topic_prefix, "ghisjlgoc");
        assert!(config.mqtt.connect_on_start);
        assert_eq!(config.control.evaluation, EvaluationPolicy::FreshReading);
        assert_eq!(config.control.target, 1100);
        assert_eq!(config.telemetry, TelemetryConfig::default());
    }

    #[test]
    fn empty_toml_is_default() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = Config::from_toml_str("[control]\ntarget = \"high\"").unwrap_err();
        assert!(matches!(err, crate::VentError::Config(_)));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = Config::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, crate::VentError::Io(_)));
    }

    #[test]
    fn builder_pattern() {
        let config = Config::default()
            .with_mqtt(
                MqttConfig::default()
                    .with_host("broker.local")
                    .with_port(8883)
                    .with_client_id("vent-2")
                    .with_connect_on_start(true),
            )
            .with_telemetry(TelemetryConfig::default().with_interval_secs(30));

        assert_eq!(config.mqtt.host, "broker.local");
        assert_eq!(config.mqtt.port, 8883);
        assert_eq!(config.mqtt.client_id, "vent-2");
        assert!(config.mqtt.connect_on_start);
        assert_eq!(config.telemetry.interval_secs, 30);
    }
}
