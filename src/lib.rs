//! # smart-vent
//!
//! A simulated CO2-driven ventilation controller with an MQTT telemetry and
//! command link.
//!
//! ## Features
//!
//! - **Sensor simulation**: bounded random walk that drifts toward a low or a
//!   high equilibrium depending on the fan
//! - **Hysteresis control**: the fan switches only outside `target ± band`, so
//!   a noisy reading inside the band never makes it chatter
//! - **Manual overrides**: the operator can own the reading, the fan, or both
//! - **Telemetry**: the reading is published on a timer whose period can be
//!   changed at runtime
//! - **Remote commands**: a peer can switch modes and drive the fan over MQTT
//!
//! ## Architecture
//!
//! - `state` - Shared control state, safe to use from every task
//! - `fan` - Pure hysteresis rule
//! - `sensor` - Random-walk simulator
//! - `command` - Remote and operator command decoding
//! - `traits` - Messaging link and display seams
//! - `hal` - Console display and mocks for testing
//! - `services` - Control loop, telemetry, receiver, operator, MQTT link
//!
//! ## Example
//!
//! ```rust
//! use smart_vent::{FanController, FanState, HysteresisConfig, SharedControlState};
//!
//! let state = SharedControlState::new(1250);
//! let hysteresis = HysteresisConfig::default(); // 1100 ± 100
//!
//! let fan = state.update_fan(|fan, manual| {
//!     FanController::evaluate(state.reading(), &hysteresis, manual, fan)
//! });
//! assert_eq!(fan, FanState::On);
//!
//! // Inside the band nothing changes
//! state.set_reading(1150);
//! let fan = state.update_fan(|fan, manual| {
//!     FanController::evaluate(state.reading(), &hysteresis, manual, fan)
//! });
//! assert_eq!(fan, FanState::On);
//! ```

#![warn(missing_docs)]

/// Remote and operator command types.
pub mod command;
/// Layered configuration loaded from TOML.
pub mod config;
/// Error type shared by every fallible operation.
pub mod error;
/// Hysteresis fan controller.
pub mod fan;
/// Console display and mock implementations.
pub mod hal;
/// Simulated CO2 sensor.
pub mod sensor;
/// Concurrent services: control loop, telemetry, command handling, MQTT.
pub mod services;
/// Shared control state.
pub mod state;
/// Messaging and display abstractions.
pub mod traits;

// Re-exports for convenience
pub use command::{InboundCommand, OperatorCommand};
pub use config::{Config, ControlConfig, EvaluationPolicy, MqttConfig, TelemetryConfig};
pub use error::{Result, VentError};
pub use fan::{FanController, HysteresisConfig};
pub use sensor::SensorSimulator;
pub use state::{ControlSnapshot, FanState, ModeFlags, SharedControlState};
pub use traits::{InboundMessage, MessagingLink, VentDisplay};
