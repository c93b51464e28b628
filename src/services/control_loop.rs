//! Control loop driver.
//!
//! Once per tick:
//!
//! 1. capture the current reading,
//! 2. advance the simulator and store the new reading,
//! 3. run the hysteresis evaluation,
//! 4. refresh the display with the new reading and fan state.
//!
//! Under [`EvaluationPolicy::PreviousReading`] (the default) step 3 uses the
//! reading captured in step 1, so the fan reacts one tick after the sensor.
//! [`EvaluationPolicy::FreshReading`] evaluates the value produced in step 2.
//!
//! The driver is either stopped or running. `start` spawns the tick task;
//! `stop` cancels it and waits for it to exit.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ControlConfig, EvaluationPolicy};
use crate::error::{Result, VentError};
use crate::fan::FanController;
use crate::sensor::SensorSimulator;
use crate::state::{FanState, SharedControlState};
use crate::traits::VentDisplay;

/// Lifecycle of the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    /// No tick task.
    Stopped,
    /// Tick task running.
    Running,
}

/// What one cycle did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CycleReport {
    /// Reading the fan decision was made against.
    pub evaluated: i64,
    /// Reading after the simulator step.
    pub reading: i64,
    /// Fan state after the decision.
    pub fan: FanState,
    /// Whether the fan state changed this cycle.
    pub fan_changed: bool,
}

// ============================================================================
// Control Cycle
// ============================================================================

/// One tick's worth of work, independent of timing.
pub struct ControlCycle<D: VentDisplay, R = StdRng> {
    state: Arc<SharedControlState>,
    display: Arc<D>,
    simulator: Mutex<SensorSimulator<R>>,
    policy: EvaluationPolicy,
}

impl<D: VentDisplay, R: Rng> ControlCycle<D, R> {
    /// Create a cycle over `state`.
    pub fn new(
        state: Arc<SharedControlState>,
        display: Arc<D>,
        simulator: SensorSimulator<R>,
        policy: EvaluationPolicy,
    ) -> Self {
        Self {
            state,
            display,
            simulator: Mutex::new(simulator),
            policy,
        }
    }

    /// Evaluation policy in use.
    pub fn policy(&self) -> EvaluationPolicy {
        self.policy
    }

    /// Run one cycle.
    pub fn step(&self) -> CycleReport {
        let state = &self.state;

        let previous = state.reading();
        let reading = self
            .simulator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .advance(state.fan_state(), previous, state.manual_sensor());
        // Unchanged readings are not written back, so an operator value stored
        // since `previous` was captured survives
        if reading != previous {
            state.set_reading(reading);
        }

        let evaluated = match self.policy {
            EvaluationPolicy::PreviousReading => previous,
            EvaluationPolicy::FreshReading => reading,
        };
        let hysteresis = state.hysteresis();
        let mut before = FanState::Off;
        let fan = state.update_fan(|fan, manual_fan| {
            before = fan;
            FanController::evaluate(evaluated, &hysteresis, manual_fan, fan)
        });
        let fan_changed = fan != before;
        if fan_changed {
            info!(reading = evaluated, %fan, "fan switched");
        }

        self.display.refresh_reading(state.reading());
        self.display.refresh_fan_state(fan);
        debug!(previous, reading, %fan, "control tick");

        CycleReport {
            evaluated,
            reading,
            fan,
            fan_changed,
        }
    }
}

// ============================================================================
// Control Loop Driver
// ============================================================================

struct Running {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns the periodic control task.
pub struct ControlLoopDriver<D: VentDisplay, R = StdRng> {
    cycle: Arc<ControlCycle<D, R>>,
    tick: Duration,
    running: Option<Running>,
}

impl<D: VentDisplay> ControlLoopDriver<D, StdRng> {
    /// Create a stopped driver with an entropy-seeded simulator.
    pub fn new(state: Arc<SharedControlState>, display: Arc<D>, config: &ControlConfig) -> Self {
        Self::with_simulator(state, display, config, SensorSimulator::new())
    }
}

impl<D, R> ControlLoopDriver<D, R>
where
    D: VentDisplay,
    R: Rng + Send + 'static,
{
    /// Create a stopped driver with an explicit simulator.
    pub fn with_simulator(
        state: Arc<SharedControlState>,
        display: Arc<D>,
        config: &ControlConfig,
        simulator: SensorSimulator<R>,
    ) -> Self {
        Self {
            cycle: Arc::new(ControlCycle::new(
                state,
                display,
                simulator,
                config.evaluation,
            )),
            tick: config.tick(),
            running: None,
        }
    }

    /// The cycle this driver runs. Useful for stepping by hand in tests.
    pub fn cycle(&self) -> &ControlCycle<D, R> {
        &self.cycle
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DriverState {
        if self.running.is_some() {
            DriverState::Running
        } else {
            DriverState::Stopped
        }
    }

    /// Start ticking. The first cycle runs immediately.
    ///
    /// Fails with [`VentError::AlreadyRunning`] if already started; nothing
    /// extra is scheduled in that case. Must be called from within a tokio
    /// runtime.
    pub fn start(&mut self) -> Result<()> {
        if self.running.is_some() {
            return Err(VentError::AlreadyRunning("control loop"));
        }
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(Arc::clone(&self.cycle), self.tick, cancel.clone()));
        self.running = Some(Running { cancel, task });
        info!(tick = ?self.tick, policy = ?self.cycle.policy(), "control loop started");
        Ok(())
    }

    /// Stop ticking.
    ///
    /// Returns once the task has exited; the driver does not touch the shared
    /// state after that. No-op when already stopped.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        running.cancel.cancel();
        if let Err(e) = running.task.await {
            warn!(error = %e, "control task ended abnormally");
        }
        info!("control loop stopped");
    }
}

impl<D: VentDisplay, R> Drop for ControlLoopDriver<D, R> {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.cancel.cancel();
        }
    }
}

async fn run<D, R>(cycle: Arc<ControlCycle<D, R>>, tick: Duration, cancel: CancellationToken)
where
    D: VentDisplay,
    R: Rng + Send + 'static,
{
    let mut interval = time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                cycle.step();
            }
        }
    }
}
