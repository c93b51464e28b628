//! Shared control state.
//!
//! `SharedControlState` is created once at startup and handed to every
//! concurrent context behind an `Arc`. No field is reachable directly:
//!
//! - the reading is an `AtomicI64` (written every control tick, read on every
//!   publish and every refresh),
//! - the fan state and the manual-fan flag share one mutex, because every
//!   write to the fan is gated on that flag and the check must not race with
//!   an operator switching modes,
//! - the remaining mode flags are independent `AtomicBool`s,
//! - the hysteresis settings sit behind their own mutex.
//!
//! Readers may observe the reading and the fan state from slightly different
//! instants; nothing relies on a cross-field snapshot being consistent.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use smart_vent::{FanState, SharedControlState};
//!
//! let state = Arc::new(SharedControlState::new(1050));
//! assert_eq!(state.reading(), 1050);
//! assert_eq!(state.fan_state(), FanState::Off);
//!
//! // Manual fan commands only apply in manual mode
//! assert!(!state.set_fan_manually(FanState::On));
//! state.set_manual_fan(true);
//! assert!(state.set_fan_manually(FanState::On));
//! assert_eq!(state.fan_state(), FanState::On);
//! ```

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use serde::Serialize;

use crate::config::ControlConfig;
use crate::error::{Result, VentError};
use crate::fan::HysteresisConfig;

// ============================================================================
// Fan State
// ============================================================================

/// Fan actuator state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FanState {
    /// Fan running.
    On,
    /// Fan stopped.
    #[default]
    Off,
}

impl FanState {
    /// Returns the state as a lowercase string.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            FanState::On => "on",
            FanState::Off => "off",
        }
    }

    /// Whether the fan is running.
    #[inline]
    pub const fn is_on(&self) -> bool {
        matches!(self, FanState::On)
    }

    /// The opposite state.
    #[inline]
    pub const fn toggled(&self) -> Self {
        match self {
            FanState::On => FanState::Off,
            FanState::Off => FanState::On,
        }
    }
}

impl From<bool> for FanState {
    fn from(on: bool) -> Self {
        if on {
            FanState::On
        } else {
            FanState::Off
        }
    }
}

impl core::fmt::Display for FanState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Mode Flags
// ============================================================================

/// Operator mode flags, as observed at one instant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ModeFlags {
    /// Operator owns the fan; automatic control is suspended.
    pub manual_fan: bool,
    /// Operator owns the reading; the simulator is suspended.
    pub manual_sensor: bool,
    /// Messaging link requested by the operator.
    pub messaging_enabled: bool,
}

/// Point-in-time view of the whole state, for status output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ControlSnapshot {
    /// Current reading (ppm)
    pub reading: i64,
    /// Current fan state
    pub fan: FanState,
    /// Mode flags
    pub modes: ModeFlags,
    /// Hysteresis settings
    pub hysteresis: HysteresisConfig,
    /// Seconds since the state was created
    pub uptime_secs: u64,
}

#[derive(Clone, Copy, Debug, Default)]
struct Actuator {
    fan: FanState,
    manual_fan: bool,
}

// ============================================================================
// Shared Control State
// ============================================================================

/// State shared by the control loop, telemetry publisher, command receiver,
/// and the operator surface.
#[derive(Debug)]
pub struct SharedControlState {
    reading: AtomicI64,
    actuator: Mutex<Actuator>,
    manual_sensor: AtomicBool,
    messaging_enabled: AtomicBool,
    hysteresis: Mutex<HysteresisConfig>,
    start_time: Instant,
}

impl SharedControlState {
    /// Create the state with the given seed reading, fan off, and every mode
    /// flag cleared.
    pub fn new(initial_reading: i64) -> Self {
        Self::with_hysteresis(initial_reading, HysteresisConfig::default())
    }

    /// Create the state with explicit hysteresis settings.
    pub fn with_hysteresis(initial_reading: i64, hysteresis: HysteresisConfig) -> Self {
        Self {
            reading: AtomicI64::new(initial_reading),
            actuator: Mutex::new(Actuator::default()),
            manual_sensor: AtomicBool::new(false),
            messaging_enabled: AtomicBool::new(false),
            hysteresis: Mutex::new(hysteresis),
            start_time: Instant::now(),
        }
    }

    /// Create the state from the control section of the configuration.
    pub fn from_config(config: &ControlConfig) -> Self {
        Self::with_hysteresis(config.initial_reading, HysteresisConfig::from_config(config))
    }

    fn actuator(&self) -> MutexGuard<'_, Actuator> {
        self.actuator.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn hysteresis_guard(&self) -> MutexGuard<'_, HysteresisConfig> {
        self.hysteresis.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ------------------------------------------------------------------------
    // Reading
    // ------------------------------------------------------------------------

    /// Current reading.
    #[inline]
    pub fn reading(&self) -> i64 {
        self.reading.load(Ordering::Acquire)
    }

    /// Store a new reading.
    ///
    /// Used by the control loop after each simulator step and by the operator
    /// when overriding the sensor.
    #[inline]
    pub fn set_reading(&self, reading: i64) {
        self.reading.store(reading, Ordering::Release);
    }

    // ------------------------------------------------------------------------
    // Fan
    // ------------------------------------------------------------------------

    /// Current fan state.
    pub fn fan_state(&self) -> FanState {
        self.actuator().fan
    }

    /// Whether the operator owns the fan.
    pub fn manual_fan(&self) -> bool {
        self.actuator().manual_fan
    }

    /// Switch between manual and automatic fan control.
    ///
    /// Returns the previous value. The fan state itself is left alone; in auto
    /// mode the next control tick decides.
    pub fn set_manual_fan(&self, manual: bool) -> bool {
        let mut actuator = self.actuator();
        core::mem::replace(&mut actuator.manual_fan, manual)
    }

    /// Set the fan from an explicit operator or remote command.
    ///
    /// Applied only while in manual mode; returns whether it was applied.
    pub fn set_fan_manually(&self, fan: FanState) -> bool {
        let mut actuator = self.actuator();
        if !actuator.manual_fan {
            return false;
        }
        actuator.fan = fan;
        true
    }

    /// Flip the fan, only while in manual mode.
    ///
    /// Returns the new state, or `None` if automatic control owns the fan.
    pub fn toggle_fan(&self) -> Option<FanState> {
        let mut actuator = self.actuator();
        if !actuator.manual_fan {
            return None;
        }
        actuator.fan = actuator.fan.toggled();
        Some(actuator.fan)
    }

    /// Run an automatic fan decision under the actuator lock.
    ///
    /// `decide` receives the current fan state and the manual-fan flag and
    /// returns the next state, which is stored and returned. Holding the lock
    /// across the decision keeps an operator mode switch from interleaving
    /// with the write.
    pub fn update_fan<F>(&self, decide: F) -> FanState
    where
        F: FnOnce(FanState, bool) -> FanState,
    {
        let mut actuator = self.actuator();
        actuator.fan = decide(actuator.fan, actuator.manual_fan);
        actuator.fan
    }

    // ------------------------------------------------------------------------
    // Mode flags
    // ------------------------------------------------------------------------

    /// Whether the operator owns the reading.
    #[inline]
    pub fn manual_sensor(&self) -> bool {
        self.manual_sensor.load(Ordering::Acquire)
    }

    /// Switch between simulated and operator-provided readings.
    pub fn set_manual_sensor(&self, manual: bool) {
        self.manual_sensor.store(manual, Ordering::Release);
    }

    /// Whether the operator has asked for the messaging link.
    #[inline]
    pub fn messaging_enabled(&self) -> bool {
        self.messaging_enabled.load(Ordering::Acquire)
    }

    /// Record whether the messaging link should be up.
    pub fn set_messaging_enabled(&self, enabled: bool) {
        self.messaging_enabled.store(enabled, Ordering::Release);
    }

    /// All mode flags.
    pub fn modes(&self) -> ModeFlags {
        ModeFlags {
            manual_fan: self.manual_fan(),
            manual_sensor: self.manual_sensor(),
            messaging_enabled: self.messaging_enabled(),
        }
    }

    // ------------------------------------------------------------------------
    // Hysteresis
    // ------------------------------------------------------------------------

    /// Current hysteresis settings.
    pub fn hysteresis(&self) -> HysteresisConfig {
        *self.hysteresis_guard()
    }

    /// Replace the hysteresis settings.
    ///
    /// A negative band is rejected and the stored settings are left as they
    /// were.
    pub fn set_hysteresis(&self, hysteresis: HysteresisConfig) -> Result<()> {
        if hysteresis.band() < 0 {
            return Err(VentError::InvalidBand(hysteresis.band()));
        }
        *self.hysteresis_guard() = hysteresis;
        Ok(())
    }

    /// Set the target, clamped to the operator range. Returns the stored value.
    pub fn set_target(&self, target: i64) -> i64 {
        let mut guard = self.hysteresis_guard();
        *guard = guard.with_target(target);
        guard.target()
    }

    /// Set the band, clamped to the operator range. Returns the stored value.
    pub fn set_band(&self, band: i64) -> i64 {
        let mut guard = self.hysteresis_guard();
        *guard = guard.with_band(band);
        guard.band()
    }

    // ------------------------------------------------------------------------
    // Snapshot
    // ------------------------------------------------------------------------

    /// Seconds since the state was created.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Gather every field. Fields are read one after another, not atomically.
    pub fn snapshot(&self) -> ControlSnapshot {
        let actuator = *self.actuator();
        ControlSnapshot {
            reading: self.reading(),
            fan: actuator.fan,
            modes: ModeFlags {
                manual_fan: actuator.manual_fan,
                manual_sensor: self.manual_sensor(),
                messaging_enabled: self.messaging_enabled(),
            },
            hysteresis: self.hysteresis(),
            uptime_secs: self.uptime_secs(),
        }
    }
}

impl Default for SharedControlState {
    fn default() -> Self {
        Self::from_config(&ControlConfig::default())
    }
}
