//! Periodic telemetry publisher.
//!
//! Publishes the current reading as a decimal string on the air-quality topic
//! every `interval` seconds. A fire while the link is down is skipped: nothing
//! is queued and nothing is retried, the next fire simply tries again.
//!
//! The timer is a single `tokio::time::Sleep` that is reset in place, both
//! after every fire and whenever the interval changes. Changing the interval
//! therefore discards the pending deadline and schedules the next fire
//! `interval` after the change, never on the old schedule.
//!
//! # Example
//!
//! ```ignore
//! let publisher = TelemetryPublisher::spawn(state, link, config.mqtt.air_quality_topic(), 10)?;
//! let handle = publisher.handle();
//!
//! handle.set_interval(5)?;   // next fire in 5 s
//! publisher.stop().await;    // no publish after this returns
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::INTERVAL_RANGE_SECS;
use crate::error::{Result, VentError};
use crate::state::SharedControlState;
use crate::traits::MessagingLink;

/// Result of a single publish attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Reading sent.
    Published(i64),
    /// Link down; nothing sent.
    Skipped,
    /// Link up but the publish failed; logged.
    Failed,
}

fn validate_interval(secs: u64) -> Result<Duration> {
    let (min, max) = INTERVAL_RANGE_SECS;
    if !(min..=max).contains(&secs) {
        return Err(VentError::InvalidInterval { got: secs, min, max });
    }
    Ok(Duration::from_secs(secs))
}

/// Publish the current reading once.
pub async fn publish_reading<L: MessagingLink>(
    state: &SharedControlState,
    link: &L,
    topic: &str,
) -> PublishOutcome {
    if !link.is_connected() {
        trace!(topic, "link down, skipping publish");
        return PublishOutcome::Skipped;
    }
    let reading = state.reading();
    match link.publish(topic, reading.to_string().into_bytes()).await {
        Ok(()) => {
            info!(reading, topic, "sent air quality");
            PublishOutcome::Published(reading)
        }
        Err(VentError::NotConnected) => {
            trace!(topic, "link dropped before publish");
            PublishOutcome::Skipped
        }
        Err(e) => {
            warn!(error = %e, reading, topic, "error sending air quality");
            PublishOutcome::Failed
        }
    }
}

// ============================================================================
// Interval Handle
// ============================================================================

/// Cloneable handle for changing the publish interval from other contexts.
#[derive(Clone, Debug)]
pub struct TelemetryHandle {
    interval: Arc<watch::Sender<Duration>>,
}

impl TelemetryHandle {
    /// Change the interval. The next fire happens `secs` from now.
    pub fn set_interval(&self, secs: u64) -> Result<()> {
        let interval = validate_interval(secs)?;
        // send_replace never fails, even after the task has exited
        self.interval.send_replace(interval);
        info!(secs, "telemetry interval changed");
        Ok(())
    }

    /// Current interval.
    pub fn interval(&self) -> Duration {
        *self.interval.borrow()
    }
}

// ============================================================================
// Telemetry Publisher
// ============================================================================

/// Owns the publish task.
#[derive(Debug)]
pub struct TelemetryPublisher {
    handle: TelemetryHandle,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl TelemetryPublisher {
    /// Start publishing every `interval_secs` seconds.
    ///
    /// The first fire happens one full interval after the call. Must be called
    /// from within a tokio runtime.
    pub fn spawn<L: MessagingLink>(
        state: Arc<SharedControlState>,
        link: Arc<L>,
        topic: impl Into<String>,
        interval_secs: u64,
    ) -> Result<Self> {
        let interval = validate_interval(interval_secs)?;
        let (tx, rx) = watch::channel(interval);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(state, link, topic.into(), rx, cancel.clone()));

        Ok(Self {
            handle: TelemetryHandle {
                interval: Arc::new(tx),
            },
            cancel,
            task: Some(task),
        })
    }

    /// Handle for changing the interval.
    pub fn handle(&self) -> TelemetryHandle {
        self.handle.clone()
    }

    /// Change the interval. See [`TelemetryHandle::set_interval`].
    pub fn set_interval(&self, secs: u64) -> Result<()> {
        self.handle.set_interval(secs)
    }

    /// Whether the publish task is still running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop publishing.
    ///
    /// Returns once the task has observed cancellation and exited; no publish
    /// happens after that. Calling it again is a no-op.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "telemetry task ended abnormally");
            }
            debug!("telemetry publisher stopped");
        }
    }
}

impl Drop for TelemetryPublisher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run<L: MessagingLink>(
    state: Arc<SharedControlState>,
    link: Arc<L>,
    topic: String,
    mut interval_rx: watch::Receiver<Duration>,
    cancel: CancellationToken,
) {
    let mut period = *interval_rx.borrow_and_update();
    let timer = time::sleep(period);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            changed = interval_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                period = *interval_rx.borrow_and_update();
                timer.as_mut().reset(Instant::now() + period);
                debug!(?period, "telemetry timer rescheduled");
            }

            () = &mut timer => {
                timer.as_mut().reset(Instant::now() + period);
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = publish_reading(&state, &*link, &topic) => {}
                }
            }
        }
    }
}
