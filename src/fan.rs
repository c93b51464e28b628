//! Two-state hysteresis fan controller.
//!
//! The fan switches on once the reading rises above `target + band` and
//! switches off once it falls below `target - band`. Anywhere inside the band
//! (inclusive on both edges) the current state is kept, which is what stops the
//! fan from chattering when the reading hovers around the target.
//!
//! ```text
//!            target - band        target        target + band
//!   ────────────┼───────────────────┼───────────────────┼──────────▶ reading
//!     → Off     │            keep current state         │    → On
//! ```
//!
//! # Example
//!
//! ```rust
//! use smart_vent::{FanController, FanState, HysteresisConfig};
//!
//! let hysteresis = HysteresisConfig::default(); // target 1100, band 100
//!
//! // 1250 is above 1200: switch on
//! let fan = FanController::evaluate(1250, &hysteresis, false, FanState::Off);
//! assert_eq!(fan, FanState::On);
//!
//! // 1150 is inside the band: stay on
//! let fan = FanController::evaluate(1150, &hysteresis, false, fan);
//! assert_eq!(fan, FanState::On);
//! ```

use serde::{Deserialize, Serialize};

use crate::config::{ControlConfig, BAND_RANGE, TARGET_RANGE};
use crate::error::{Result, VentError};
use crate::state::FanState;

/// Target and dead-band half-width for the fan controller.
///
/// The band is never negative: [`new`](Self::new) rejects one, the builders
/// clamp, and deserialization goes through `new`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawHysteresis")]
pub struct HysteresisConfig {
    target: i64,
    band: i64,
}

#[derive(Deserialize)]
struct RawHysteresis {
    target: i64,
    band: i64,
}

impl TryFrom<RawHysteresis> for HysteresisConfig {
    type Error = VentError;

    fn try_from(raw: RawHysteresis) -> Result<Self> {
        Self::new(raw.target, raw.band)
    }
}

impl Default for HysteresisConfig {
    fn default() -> Self {
        Self {
            target: 1100,
            band: 100,
        }
    }
}

impl HysteresisConfig {
    /// Create a config, rejecting a negative band.
    pub fn new(target: i64, band: i64) -> Result<Self> {
        if band < 0 {
            return Err(VentError::InvalidBand(band));
        }
        Ok(Self { target, band })
    }

    /// Build from the control section of the configuration, clamping both
    /// values to their operator ranges.
    pub fn from_config(config: &ControlConfig) -> Self {
        Self {
            target: config.target.clamp(TARGET_RANGE.0, TARGET_RANGE.1),
            band: config.band.clamp(BAND_RANGE.0, BAND_RANGE.1),
        }
    }

    /// Reading the controller tries to hold.
    #[inline]
    pub fn target(&self) -> i64 {
        self.target
    }

    /// Half-width of the dead band around the target.
    #[inline]
    pub fn band(&self) -> i64 {
        self.band
    }

    /// Same band, new target clamped to the operator range.
    pub fn with_target(self, target: i64) -> Self {
        Self {
            target: target.clamp(TARGET_RANGE.0, TARGET_RANGE.1),
            ..self
        }
    }

    /// Same target, new band clamped to the operator range.
    pub fn with_band(self, band: i64) -> Self {
        Self {
            band: band.clamp(BAND_RANGE.0, BAND_RANGE.1),
            ..self
        }
    }

    /// Reading above which the fan switches on.
    #[inline]
    pub fn upper(&self) -> i64 {
        self.target.saturating_add(self.band)
    }

    /// Reading below which the fan switches off.
    #[inline]
    pub fn lower(&self) -> i64 {
        self.target.saturating_sub(self.band)
    }

    /// Whether `reading` sits inside the dead band (edges included).
    #[inline]
    pub fn in_band(&self, reading: i64) -> bool {
        (self.lower()..=self.upper()).contains(&reading)
    }
}

/// Stateless hysteresis evaluator.
///
/// All state lives in the caller; `evaluate` is a pure function of its
/// arguments.
#[derive(Clone, Copy, Debug, Default)]
pub struct FanController;

impl FanController {
    /// Decide the next fan state.
    ///
    /// With `manual_fan` set the current state is returned untouched: the
    /// operator owns the fan.
    pub fn evaluate(
        reading: i64,
        hysteresis: &HysteresisConfig,
        manual_fan: bool,
        fan: FanState,
    ) -> FanState {
        if manual_fan {
            return fan;
        }
        if reading > hysteresis.upper() {
            FanState::On
        } else if reading < hysteresis.lower() {
            FanState::Off
        } else {
            fan
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> HysteresisConfig {
        HysteresisConfig::new(1100, 100).unwrap()
    }

    #[test]
    fn test_inside_band_keeps_off() {
        assert_eq!(
            FanController::evaluate(1050, &cfg(), false, FanState::Off),
            FanState::Off
        );
    }

    #[test]
    fn test_above_band_turns_on() {
        assert_eq!(
            FanController::evaluate(1250, &cfg(), false, FanState::Off),
            FanState::On
        );
    }

    #[test]
    fn test_inside_band_keeps_on() {
        assert_eq!(
            FanController::evaluate(1150, &cfg(), false, FanState::On),
            FanState::On
        );
    }

    #[test]
    fn test_below_band_turns_off() {
        assert_eq!(
            FanController::evaluate(999, &cfg(), false, FanState::On),
            FanState::Off
        );
    }

    #[test]
    fn test_band_edges_are_inside() {
        // Strict comparisons: the edges themselves never flip the state
        for fan in [FanState::On, FanState::Off] {
            assert_eq!(FanController::evaluate(1200, &cfg(), false, fan), fan);
            assert_eq!(FanController::evaluate(1000, &cfg(), false, fan), fan);
        }
        assert_eq!(
            FanController::evaluate(1201, &cfg(), false, FanState::Off),
            FanState::On
        );
    }

    #[test]
    fn test_manual_fan_never_changes() {
        for reading in [0, 999, 1100, 1201, 5000] {
            for fan in [FanState::On, FanState::Off] {
                assert_eq!(FanController::evaluate(reading, &cfg(), true, fan), fan);
            }
        }
    }

    #[test]
    fn test_zero_band_switches_on_either_side() {
        let cfg = HysteresisConfig::new(1100, 0).unwrap();
        assert_eq!(
            FanController::evaluate(1101, &cfg, false, FanState::Off),
            FanState::On
        );
        assert_eq!(
            FanController::evaluate(1099, &cfg, false, FanState::On),
            FanState::Off
        );
        assert_eq!(
            FanController::evaluate(1100, &cfg, false, FanState::On),
            FanState::On
        );
    }

    #[test]
    fn test_negative_band_rejected() {
        assert!(matches!(
            HysteresisConfig::new(1100, -1),
            Err(VentError::InvalidBand(-1))
        ));
    }

    #[test]
    fn test_in_band() {
        let cfg = cfg();
        assert!(cfg.in_band(1000));
        assert!(cfg.in_band(1200));
        assert!(!cfg.in_band(999));
        assert!(!cfg.in_band(1201));
    }

    #[test]
    fn test_from_config_clamps() {
        let control = ControlConfig {
            target: 100,
            band: 900,
            ..ControlConfig::default()
        };
        let cfg = HysteresisConfig::from_config(&control);
        assert_eq!(cfg.target(), 400);
        assert_eq!(cfg.band(), 400);
    }

    #[test]
    fn test_builders_clamp() {
        let cfg = cfg().with_band(-100).with_target(9000);
        assert_eq!(cfg.band(), 0);
        assert_eq!(cfg.target(), 5000);
        assert!(cfg.lower() <= cfg.upper());
    }

    #[test]
    fn test_deserialize_validates_band() {
        let cfg: HysteresisConfig = toml::from_str("target = 1100\nband = 50").unwrap();
        assert_eq!(cfg, HysteresisConfig::new(1100, 50).unwrap());

        let err = toml::from_str::<HysteresisConfig>("target = 1100\nband = -100").unwrap_err();
        assert!(err.to_string().contains("-100"));
    }
}
