//! Mock implementations for testing without a broker or a screen.
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockLink`] | [`MessagingLink`] | Records publishes, toggles connectivity |
//! | [`MockDisplay`] | [`VentDisplay`] | Records every refresh |
//!
//! Both are used behind an `Arc` and record through interior mutability, so a
//! test keeps one handle while the services under test hold another.
//!
//! # Example
//!
//! ```rust
//! use smart_vent::hal::MockLink;
//! use smart_vent::traits::MessagingLink;
//!
//! let link = MockLink::new();
//! assert!(link.is_connected());
//!
//! link.set_connected(false);
//! assert!(!link.is_connected());
//! assert!(link.published().is_empty());
//! ```
//!
//! [`MessagingLink`]: crate::traits::MessagingLink
//! [`VentDisplay`]: crate::traits::VentDisplay

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::error::{Result, VentError};
use crate::state::{FanState, ModeFlags};
use crate::traits::{MessagingLink, VentDisplay};

// ============================================================================
// Link Mock
// ============================================================================

/// Mock messaging link.
///
/// Starts connected. `connect()`/`disconnect()` flip the connected flag and
/// count calls; `publish()` records `(topic, payload)` pairs.
#[derive(Debug)]
pub struct MockLink {
    connected: AtomicBool,
    fail_publish: AtomicBool,
    connect_failures: AtomicUsize,
    published: Mutex<Vec<(String, Vec<u8>)>>,
    connect_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
}

impl MockLink {
    /// Creates a new mock link in connected state.
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            fail_publish: AtomicBool::new(false),
            connect_failures: AtomicUsize::new(0),
            published: Mutex::new(Vec::new()),
            connect_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
        }
    }

    /// Creates a new mock link in disconnected state.
    pub fn disconnected() -> Self {
        let link = Self::new();
        link.set_connected(false);
        link
    }

    /// Force the connected flag.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Make subsequent publishes fail while connected.
    pub fn fail_publishes(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Make the next `count` connects fail. `usize::MAX` fails forever.
    pub fn fail_connects(&self, count: usize) {
        self.connect_failures.store(count, Ordering::SeqCst);
    }

    /// Every successful publish so far.
    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Payloads published to one topic, as strings.
    pub fn published_to(&self, topic: &str) -> Vec<String> {
        self.published()
            .into_iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, payload)| String::from_utf8_lossy(&payload).into_owned())
            .collect()
    }

    /// Number of `connect()` calls.
    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    /// Number of `disconnect()` calls.
    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockLink {
    fn default() -> Self {
        Self::new()
    }
}

impl MessagingLink for MockLink {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        if !self.is_connected() {
            return Err(VentError::NotConnected);
        }
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(VentError::Publish("mock failure".to_string()));
        }
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((topic.to_string(), payload));
        Ok(())
    }

    async fn connect(&self) -> Result<()> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .connect_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                0 => None,
                usize::MAX => Some(usize::MAX),
                n => Some(n - 1),
            })
            .is_ok();
        if failing {
            return Err(VentError::Connect("mock failure".to_string()));
        }
        self.set_connected(true);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        self.set_connected(false);
        Ok(())
    }
}

// ============================================================================
// Display Mock
// ============================================================================

/// Mock display recording every refresh.
#[derive(Debug, Default)]
pub struct MockDisplay {
    readings: Mutex<Vec<i64>>,
    fans: Mutex<Vec<FanState>>,
    modes: Mutex<Vec<ModeFlags>>,
}

impl MockDisplay {
    /// Creates an empty mock display.
    pub fn new() -> Self {
        Self::default()
    }

    /// Readings shown so far, oldest first.
    pub fn readings(&self) -> Vec<i64> {
        self.readings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Fan states shown so far, oldest first.
    pub fn fan_states(&self) -> Vec<FanState> {
        self.fans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Mode refreshes so far, oldest first.
    pub fn modes(&self) -> Vec<ModeFlags> {
        self.modes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of reading refreshes.
    pub fn refresh_count(&self) -> usize {
        self.readings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl VentDisplay for MockDisplay {
    fn refresh_reading(&self, reading: i64) {
        self.readings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(reading);
    }

    fn refresh_fan_state(&self, fan: FanState) {
        self.fans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(fan);
    }

    fn refresh_mode(&self, modes: ModeFlags) {
        self.modes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(modes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // MockLink Tests
    // ========================================================================

    #[tokio::test]
    async fn test_mock_link_records_publishes() {
        let link = MockLink::new();
        link.publish("vent/air_quality", b"1100".to_vec()).await.unwrap();
        link.publish("vent/other", b"x".to_vec()).await.unwrap();

        assert_eq!(link.published().len(), 2);
        assert_eq!(link.published_to("vent/air_quality"), vec!["1100"]);
    }

    #[tokio::test]
    async fn test_mock_link_disconnected_rejects() {
        let link = MockLink::disconnected();
        let result = link.publish("t", b"1".to_vec()).await;
        assert!(matches!(result, Err(VentError::NotConnected)));
        assert!(link.published().is_empty());
    }

    #[tokio::test]
    async fn test_mock_link_failures() {
        let link = MockLink::new();
        link.fail_publishes(true);
        assert!(matches!(
            link.publish("t", b"1".to_vec()).await,
            Err(VentError::Publish(_))
        ));

        link.set_connected(false);
        link.fail_connects(1);
        assert!(link.connect().await.is_err());
        assert!(!link.is_connected());
        assert!(link.connect().await.is_ok());
        assert!(link.is_connected());
        assert_eq!(link.connect_calls(), 2);
    }

    #[tokio::test]
    async fn test_mock_link_lifecycle() {
        let link = MockLink::disconnected();
        link.connect().await.unwrap();
        assert!(link.is_connected());
        link.disconnect().await.unwrap();
        link.disconnect().await.unwrap();
        assert!(!link.is_connected());
        assert_eq!(link.disconnect_calls(), 2);
    }

    // ========================================================================
    // MockDisplay Tests
    // ========================================================================

    #[test]
    fn test_mock_display_records() {
        let display = MockDisplay::new();
        display.refresh_reading(1000);
        display.refresh_reading(1010);
        display.refresh_fan_state(FanState::On);
        display.refresh_mode(ModeFlags::default());

        assert_eq!(display.readings(), vec![1000, 1010]);
        assert_eq!(display.fan_states(), vec![FanState::On]);
        assert_eq!(display.modes().len(), 1);
        assert_eq!(display.refresh_count(), 2);
    }
}
