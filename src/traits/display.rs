//! Display abstraction for readings and fan state.

use crate::state::{FanState, ModeFlags};

/// Sink for operator-facing refreshes.
///
/// Called from the control loop task and the command receiver task, so
/// implementations must be safe to invoke from any thread. A GUI backend would
/// forward each call onto its own UI thread.
///
/// # Example
///
/// ```
/// use smart_vent::traits::VentDisplay;
/// use smart_vent::FanState;
///
/// struct Stdout;
///
/// impl VentDisplay for Stdout {
///     fn refresh_reading(&self, reading: i64) {
///         println!("CO2 level: {reading} ppm");
///     }
///     fn refresh_fan_state(&self, fan: FanState) {
///         println!("Fan: {fan}");
///     }
/// }
/// ```
pub trait VentDisplay: Send + Sync + 'static {
    /// Show a new reading.
    fn refresh_reading(&self, reading: i64);

    /// Show a new fan state.
    fn refresh_fan_state(&self, fan: FanState);

    /// Reflect a mode change made remotely.
    fn refresh_mode(&self, _modes: ModeFlags) {}
}
