//! Simulated CO2 sensor.
//!
//! Each step is a bounded random walk. With the fan running the reading
//! drifts down toward [`LOW_EQUILIBRIUM`]; with the fan stopped it drifts up
//! toward [`HIGH_EQUILIBRIUM`]. The step size shrinks as the reading approaches
//! the equilibrium it is heading for, so the walk slows down near it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::state::FanState;

/// Reading the walk heads for while the fan runs.
pub const LOW_EQUILIBRIUM: i64 = 400;

/// Reading the walk heads for while the fan is stopped.
pub const HIGH_EQUILIBRIUM: i64 = 2000;

/// Distance-to-step divisor while the fan runs.
pub const FAN_ON_DIVISOR: u64 = 20;

/// Distance-to-step divisor while the fan is stopped.
pub const FAN_OFF_DIVISOR: u64 = 40;

/// Random-walk sensor simulator.
///
/// Generic over the random source so tests can seed it.
#[derive(Debug, Clone)]
pub struct SensorSimulator<R = StdRng> {
    rng: R,
}

impl SensorSimulator<StdRng> {
    /// Simulator seeded from OS entropy.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Simulator with a fixed seed, for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for SensorSimulator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> SensorSimulator<R> {
    /// Simulator drawing from the given random source.
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Exclusive upper bound of the next step's magnitude.
    ///
    /// Never less than 1: sampling from an empty range is a programming
    /// error, not a "no change" result.
    pub fn step_span(fan: FanState, current: i64) -> u64 {
        let span = match fan {
            FanState::On => current.abs_diff(LOW_EQUILIBRIUM) / FAN_ON_DIVISOR,
            FanState::Off => current.abs_diff(HIGH_EQUILIBRIUM) / FAN_OFF_DIVISOR,
        };
        span.max(1)
    }

    /// Produce the next reading.
    ///
    /// Returns `current` unchanged when the operator owns the sensor.
    pub fn advance(&mut self, fan: FanState, current: i64, manual_sensor: bool) -> i64 {
        if manual_sensor {
            return current;
        }
        let span = Self::step_span(fan, current);
        let step = i64::try_from(self.rng.gen_range(0..span)).unwrap_or(i64::MAX);
        match fan {
            FanState::On => current.saturating_sub(step),
            FanState::Off => current.saturating_add(step),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_sensor_is_identity() {
        let mut sim = SensorSimulator::seeded(1);
        for fan in [FanState::On, FanState::Off] {
            assert_eq!(sim.advance(fan, 1234, true), 1234);
        }
    }

    #[test]
    fn test_step_span_values() {
        type Sim = SensorSimulator<StdRng>;
        assert_eq!(Sim::step_span(FanState::On, 1400), 50);
        assert_eq!(Sim::step_span(FanState::Off, 1200), 20);
        // Below the divisor the span clamps to 1
        assert_eq!(Sim::step_span(FanState::On, 410), 1);
        assert_eq!(Sim::step_span(FanState::Off, 2000), 1);
        // Distance is absolute on both sides of the equilibrium
        assert_eq!(Sim::step_span(FanState::On, 0), 20);
        assert_eq!(Sim::step_span(FanState::Off, 2400), 10);
    }

    #[test]
    fn test_clamped_span_never_moves() {
        // A span of 1 samples from [0, 1): always zero
        let mut sim = SensorSimulator::seeded(7);
        for _ in 0..100 {
            assert_eq!(sim.advance(FanState::Off, 2000, false), 2000);
            assert_eq!(sim.advance(FanState::On, 400, false), 400);
        }
    }

    #[test]
    fn test_fan_on_only_decreases_within_bound() {
        let mut sim = SensorSimulator::seeded(42);
        let mut reading = 1800;
        for _ in 0..500 {
            let span = SensorSimulator::<StdRng>::step_span(FanState::On, reading) as i64;
            let next = sim.advance(FanState::On, reading, false);
            assert!(next <= reading);
            assert!(reading - next < span.max(1));
            reading = next;
        }
    }

    #[test]
    fn test_fan_off_only_increases_within_bound() {
        let mut sim = SensorSimulator::seeded(43);
        let mut reading = 500;
        for _ in 0..500 {
            let span = SensorSimulator::<StdRng>::step_span(FanState::Off, reading) as i64;
            let next = sim.advance(FanState::Off, reading, false);
            assert!(next >= reading);
            assert!(next - reading < span.max(1));
            reading = next;
        }
    }

    #[test]
    fn test_walk_approaches_equilibrium() {
        let mut sim = SensorSimulator::seeded(3);
        let mut reading = 1000;
        for _ in 0..2000 {
            reading = sim.advance(FanState::Off, reading, false);
        }
        assert!(reading > 1500, "reading {reading} should drift up");
        assert!(reading <= HIGH_EQUILIBRIUM);
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let mut a = SensorSimulator::seeded(99);
        let mut b = SensorSimulator::seeded(99);
        for _ in 0..50 {
            assert_eq!(
                a.advance(FanState::Off, 1000, false),
                b.advance(FanState::Off, 1000, false)
            );
        }
    }
}
