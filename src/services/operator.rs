//! Local operator surface.
//!
//! Applies [`OperatorCommand`]s typed at the console. Each command maps to one
//! setter on the shared state, the telemetry handle, or the messaging link,
//! followed by a display refresh where the change is visible.

use std::future::Future;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

use crate::command::OperatorCommand;
use crate::config::READING_RANGE;
use crate::error::Result;
use crate::services::telemetry::TelemetryHandle;
use crate::state::SharedControlState;
use crate::traits::{MessagingLink, VentDisplay};

/// Applies operator commands.
pub struct Operator<L: MessagingLink, D: VentDisplay> {
    state: Arc<SharedControlState>,
    link: Arc<L>,
    display: Arc<D>,
    telemetry: TelemetryHandle,
}

impl<L: MessagingLink, D: VentDisplay> Operator<L, D> {
    /// Create an operator over the running services.
    pub fn new(
        state: Arc<SharedControlState>,
        link: Arc<L>,
        display: Arc<D>,
        telemetry: TelemetryHandle,
    ) -> Self {
        Self {
            state,
            link,
            display,
            telemetry,
        }
    }

    /// Apply one command.
    ///
    /// Out-of-range readings, targets and bands are clamped. An invalid interval
    /// or a failed connect is returned as an error and leaves the previous
    /// setting in place.
    pub async fn apply(&self, command: OperatorCommand) -> Result<()> {
        let state = &self.state;
        match command {
            OperatorCommand::SetReading(reading) => {
                let reading = reading.clamp(READING_RANGE.0, READING_RANGE.1);
                state.set_reading(reading);
                self.display.refresh_reading(reading);
                info!(reading, "reading set by operator");
            }
            OperatorCommand::ManualSensor(manual) => {
                state.set_manual_sensor(manual);
                self.display.refresh_mode(state.modes());
                info!(manual, "sensor mode changed");
            }
            OperatorCommand::ManualFan(manual) => {
                state.set_manual_fan(manual);
                self.display.refresh_mode(state.modes());
                info!(manual, "fan mode changed");
            }
            OperatorCommand::ToggleFan => match state.toggle_fan() {
                Some(fan) => {
                    self.display.refresh_fan_state(fan);
                    info!(%fan, "fan toggled by operator");
                }
                None => warn!("fan is under automatic control; switch to manual first"),
            },
            OperatorCommand::SetTarget(target) => {
                let target = state.set_target(target);
                info!(target, "target changed");
            }
            OperatorCommand::SetBand(band) => {
                let band = state.set_band(band);
                info!(band, "band changed");
            }
            OperatorCommand::SetInterval(secs) => self.telemetry.set_interval(secs)?,
            OperatorCommand::Messaging(true) => {
                state.set_messaging_enabled(true);
                self.display.refresh_mode(state.modes());
                if let Err(e) = self.link.connect().await {
                    state.set_messaging_enabled(false);
                    self.display.refresh_mode(state.modes());
                    return Err(e);
                }
            }
            OperatorCommand::Messaging(false) => {
                state.set_messaging_enabled(false);
                self.display.refresh_mode(state.modes());
                self.link.disconnect().await?;
            }
            OperatorCommand::Status => {
                let snapshot = state.snapshot();
                info!(
                    reading = snapshot.reading,
                    fan = %snapshot.fan,
                    manual_fan = snapshot.modes.manual_fan,
                    manual_sensor = snapshot.modes.manual_sensor,
                    messaging = snapshot.modes.messaging_enabled,
                    connected = self.link.is_connected(),
                    target = snapshot.hysteresis.target(),
                    band = snapshot.hysteresis.band(),
                    interval_secs = self.telemetry.interval().as_secs(),
                    uptime_secs = snapshot.uptime_secs,
                    "status"
                );
            }
        }
        Ok(())
    }

    /// Apply commands read line by line from `input` until `shutdown`
    /// resolves.
    ///
    /// Blank lines are skipped; unknown commands and failed ones are logged.
    /// Once the input ends the console keeps waiting for `shutdown`. The
    /// shutdown future is polled across every iteration, so a signal that
    /// arrives while a command is being applied is seen on the next turn.
    pub async fn run_console<R, S>(&self, input: R, shutdown: S)
    where
        R: AsyncBufRead + Unpin,
        S: Future<Output = ()>,
    {
        let mut lines = input.lines();
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                line = lines.next_line() => match line {
                    Ok(Some(line)) if line.trim().is_empty() => {}
                    Ok(Some(line)) => match OperatorCommand::from_text(&line) {
                        Some(command) => {
                            if let Err(e) = self.apply(command).await {
                                warn!(error = %e, "command failed");
                            }
                        }
                        None => warn!(input = %line.trim(), "unknown command"),
                    },
                    Ok(None) => {
                        info!("console input closed, waiting for shutdown");
                        (&mut shutdown).await;
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "console read failed");
                        (&mut shutdown).await;
                        break;
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VentError;
    use crate::hal::{MockDisplay, MockLink};
    use crate::services::telemetry::TelemetryPublisher;
    use crate::state::FanState;
    use std::time::Duration;
    use tokio::io::{AsyncWriteExt, BufReader};
    use tokio::sync::oneshot;
    use tokio::time;

    struct Rig {
        state: Arc<SharedControlState>,
        link: Arc<MockLink>,
        display: Arc<MockDisplay>,
        publisher: TelemetryPublisher,
        operator: Operator<MockLink, MockDisplay>,
    }

    fn rig() -> Rig {
        let state = Arc::new(SharedControlState::new(1050));
        let link = Arc::new(MockLink::disconnected());
        let display = Arc::new(MockDisplay::new());
        let publisher =
            TelemetryPublisher::spawn(Arc::clone(&state), Arc::clone(&link), "t", 10).unwrap();
        let operator = Operator::new(
            Arc::clone(&state),
            Arc::clone(&link),
            Arc::clone(&display),
            publisher.handle(),
        );
        Rig {
            state,
            link,
            display,
            publisher,
            operator,
        }
    }

    #[tokio::test]
    async fn test_set_reading_refreshes() {
        let mut rig = rig();
        rig.operator.apply(OperatorCommand::SetReading(1700)).await.unwrap();
        assert_eq!(rig.state.reading(), 1700);
        assert_eq!(rig.display.readings(), vec![1700]);
        rig.publisher.stop().await;
    }

    #[tokio::test]
    async fn test_set_reading_clamped() {
        let mut rig = rig();
        rig.operator.apply(OperatorCommand::SetReading(-50)).await.unwrap();
        assert_eq!(rig.state.reading(), 0);
        rig.operator.apply(OperatorCommand::SetReading(9000)).await.unwrap();
        assert_eq!(rig.state.reading(), 5000);
        assert_eq!(rig.display.readings(), vec![0, 5000]);
        rig.publisher.stop().await;
    }

    #[tokio::test]
    async fn test_toggle_requires_manual_fan() {
        let mut rig = rig();
        rig.operator.apply(OperatorCommand::ToggleFan).await.unwrap();
        assert_eq!(rig.state.fan_state(), FanState::Off);

        rig.operator.apply(OperatorCommand::ManualFan(true)).await.unwrap();
        rig.operator.apply(OperatorCommand::ToggleFan).await.unwrap();
        assert_eq!(rig.state.fan_state(), FanState::On);
        assert_eq!(rig.display.fan_states(), vec![FanState::On]);
        assert!(rig.display.modes()[0].manual_fan);
        rig.publisher.stop().await;
    }

    #[tokio::test]
    async fn test_hysteresis_clamped() {
        let mut rig = rig();
        rig.operator.apply(OperatorCommand::SetTarget(100)).await.unwrap();
        rig.operator.apply(OperatorCommand::SetBand(900)).await.unwrap();
        let hysteresis = rig.state.hysteresis();
        assert_eq!(hysteresis.target(), 400);
        assert_eq!(hysteresis.band(), 400);
        rig.publisher.stop().await;
    }

    #[tokio::test]
    async fn test_interval_validated() {
        let mut rig = rig();
        rig.operator.apply(OperatorCommand::SetInterval(5)).await.unwrap();
        assert_eq!(rig.publisher.handle().interval(), Duration::from_secs(5));

        let err = rig.operator.apply(OperatorCommand::SetInterval(0)).await;
        assert!(matches!(err, Err(VentError::InvalidInterval { .. })));
        assert_eq!(rig.publisher.handle().interval(), Duration::from_secs(5));
        rig.publisher.stop().await;
    }

    #[tokio::test]
    async fn test_messaging_toggles_link() {
        let mut rig = rig();
        rig.operator.apply(OperatorCommand::Messaging(true)).await.unwrap();
        assert!(rig.link.is_connected());
        assert!(rig.state.messaging_enabled());

        rig.operator.apply(OperatorCommand::Messaging(false)).await.unwrap();
        assert!(!rig.link.is_connected());
        assert!(!rig.state.messaging_enabled());
        assert_eq!(rig.link.connect_calls(), 1);
        assert_eq!(rig.link.disconnect_calls(), 1);
        rig.publisher.stop().await;
    }

    #[tokio::test]
    async fn test_failed_connect_clears_flag() {
        let mut rig = rig();
        rig.link.fail_connects(1);
        let result = rig.operator.apply(OperatorCommand::Messaging(true)).await;
        assert!(matches!(result, Err(VentError::Connect(_))));
        assert!(!rig.state.messaging_enabled());
        assert!(!rig.link.is_connected());
        rig.publisher.stop().await;
    }

    #[tokio::test]
    async fn test_manual_sensor_and_status() {
        let mut rig = rig();
        rig.operator.apply(OperatorCommand::ManualSensor(true)).await.unwrap();
        assert!(rig.state.manual_sensor());
        rig.operator.apply(OperatorCommand::Status).await.unwrap();
        rig.publisher.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_console_applies_lines_then_waits_for_shutdown() {
        let mut rig = rig();
        let input = BufReader::new(&b"sensor manual\n\n  \nbogus\nreading 1500\ntarget 900\n"[..]);
        let (tx, rx) = oneshot::channel::<()>();

        let shutdown = async {
            time::sleep(Duration::from_secs(1)).await;
            // Input is long gone; the console is still running
            assert!(rig.state.manual_sensor());
            assert_eq!(rig.state.reading(), 1500);
            assert_eq!(rig.state.hysteresis().target(), 900);
            tx.send(()).unwrap();
        };
        tokio::join!(
            rig.operator.run_console(input, async {
                let _ = rx.await;
            }),
            shutdown
        );
        rig.publisher.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_console_stops_on_shutdown_while_input_open() {
        let mut rig = rig();
        let (mut writer, reader) = tokio::io::duplex(64);
        let (tx, rx) = oneshot::channel::<()>();

        let driver = async {
            writer.write_all(b"reading 1200\n").await.unwrap();
            time::sleep(Duration::from_millis(100)).await;
            tx.send(()).unwrap();
        };
        tokio::join!(
            rig.operator.run_console(BufReader::new(reader), async {
                let _ = rx.await;
            }),
            driver
        );

        // The writer is still open, so only the shutdown ended the console
        assert_eq!(rig.state.reading(), 1200);
        drop(writer);
        rig.publisher.stop().await;
    }
}
