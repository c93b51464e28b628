//! Log-backed display for headless runs.

use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};

use tracing::{debug, info};

use crate::state::{FanState, ModeFlags};
use crate::traits::VentDisplay;

const FAN_UNKNOWN: u8 = 0;
const FAN_ON: u8 = 1;
const FAN_OFF: u8 = 2;

/// Renders refreshes as `tracing` events under the `display` target.
///
/// The control loop refreshes every tick. Repeating an unchanged value is
/// logged at `debug`, changes at `info`, so the default filter shows only what
/// moved.
#[derive(Debug)]
pub struct LogDisplay {
    last_reading: AtomicI64,
    last_fan: AtomicU8,
}

impl LogDisplay {
    /// Create a display that has shown nothing yet.
    pub fn new() -> Self {
        Self {
            last_reading: AtomicI64::new(i64::MIN),
            last_fan: AtomicU8::new(FAN_UNKNOWN),
        }
    }
}

impl Default for LogDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl VentDisplay for LogDisplay {
    fn refresh_reading(&self, reading: i64) {
        if self.last_reading.swap(reading, Ordering::Relaxed) == reading {
            debug!(target: "display", "CO2 level: {reading} ppm");
        } else {
            info!(target: "display", "CO2 level: {reading} ppm");
        }
    }

    fn refresh_fan_state(&self, fan: FanState) {
        let code = if fan.is_on() { FAN_ON } else { FAN_OFF };
        if self.last_fan.swap(code, Ordering::Relaxed) == code {
            debug!(target: "display", "Fan: {fan}");
        } else {
            info!(target: "display", "Fan: {fan}");
        }
    }

    fn refresh_mode(&self, modes: ModeFlags) {
        let mode = if modes.manual_fan { "manual" } else { "auto" };
        info!(target: "display", "Fan mode: {mode}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracks_last_values() {
        let display = LogDisplay::new();
        display.refresh_reading(1100);
        display.refresh_reading(1100);
        display.refresh_fan_state(FanState::On);
        assert_eq!(display.last_reading.load(Ordering::Relaxed), 1100);
        assert_eq!(display.last_fan.load(Ordering::Relaxed), FAN_ON);
    }
}
