//! Concurrent services built on the control core.
//!
//! Each long-lived service owns one tokio task and shares a single
//! `SharedControlState` with the others through an `Arc`:
//!
//! - `control_loop`: one simulator step and fan evaluation per tick
//! - `telemetry`: publishes the reading on a resettable timer
//! - `receiver`: applies remote commands drained from the link's channel
//! - `operator`: applies local console commands
//! - `bootstrap`: bounded connect retry for the companion console
//! - `mqtt` feature: the rumqttc-backed messaging link
//!
//! # Wiring
//!
//! ```ignore
//! use std::sync::Arc;
//! use smart_vent::services::*;
//!
//! let state = Arc::new(SharedControlState::from_config(&config.control));
//! let (tx, rx) = inbound_channel();
//! let link = Arc::new(MqttLink::new(config.mqtt.clone(), config.mqtt.update_topic(), tx));
//!
//! let mut control = ControlLoopDriver::new(Arc::clone(&state), Arc::clone(&display), &config.control);
//! control.start()?;
//! let receiver = CommandReceiver::new(Arc::clone(&state), Arc::clone(&display)).spawn(rx);
//! let mut telemetry = TelemetryPublisher::spawn(
//!     Arc::clone(&state),
//!     Arc::clone(&link),
//!     config.mqtt.air_quality_topic(),
//!     config.telemetry.interval_secs,
//! )?;
//! ```

pub mod bootstrap;
pub mod control_loop;
pub mod operator;
pub mod receiver;
pub mod telemetry;

#[cfg(feature = "mqtt")]
pub mod mqtt;

// Re-exports
pub use bootstrap::*;
pub use control_loop::*;
pub use operator::*;
pub use receiver::*;
pub use telemetry::*;

#[cfg(feature = "mqtt")]
pub use mqtt::*;
