//! Connection bootstrap with bounded retry.
//!
//! The companion console cannot do anything useful without the broker, so it
//! retries a fixed number of times with a fixed pause and then gives up.

use std::time::Duration;

use tracing::{info, warn};

use crate::error::{Result, VentError};
use crate::traits::MessagingLink;

/// How hard to try before giving up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total connect attempts, at least one.
    pub attempts: u32,
    /// Pause after each failed attempt.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Set the attempt count (minimum 1).
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Set the pause between attempts.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Connect `link`, retrying per `policy`.
///
/// Returns the attempt number that succeeded (1-based). No pause follows the
/// final failure.
pub async fn connect_with_retry<L: MessagingLink>(link: &L, policy: RetryPolicy) -> Result<u32> {
    let attempts = policy.attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        match link.connect().await {
            Ok(()) => {
                info!(attempt, "connected to mqtt server");
                return Ok(attempt);
            }
            Err(e) => {
                warn!(attempt, attempts, error = %e, "connect failed");
                last_error = Some(e);
                if attempt < attempts {
                    tokio::time::sleep(policy.backoff).await;
                }
            }
        }
    }

    let reason = last_error.map_or_else(|| "no attempt made".to_string(), |e| e.to_string());
    Err(VentError::Connect(format!(
        "gave up after {attempts} attempts: {reason}"
    )))
}
