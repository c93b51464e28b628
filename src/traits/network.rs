//! Messaging link abstraction.
//!
//! The link carries readings out to the remote peer and commands back in.
//! Inbound traffic is not part of this trait: a link implementation pushes
//! [`InboundMessage`]s into an `mpsc` channel, and whoever owns the other end
//! (the [`CommandReceiver`](crate::services::CommandReceiver) in the daemon)
//! decodes them.

use core::future::Future;

use crate::error::Result;

/// Publish/subscribe link to the remote peer.
///
/// All methods take `&self` so one link can be shared between the telemetry
/// task and the operator surface behind an `Arc`.
///
/// # Implementation Notes
///
/// - `connect` and `disconnect` must be idempotent: connecting a connected link
///   or disconnecting a disconnected one is a no-op returning `Ok(())`.
/// - `publish` on a disconnected link should return
///   [`VentError::NotConnected`](crate::VentError::NotConnected); callers check
///   [`is_connected`](Self::is_connected) first and skip silently.
pub trait MessagingLink: Send + Sync + 'static {
    /// Whether the link is currently established.
    fn is_connected(&self) -> bool;

    /// Publish `payload` on `topic` (QoS 2, not retained).
    fn publish(&self, topic: &str, payload: Vec<u8>) -> impl Future<Output = Result<()>> + Send;

    /// Establish the link and start the inbound subscription.
    fn connect(&self) -> impl Future<Output = Result<()>> + Send;

    /// Unsubscribe and close the link within a bounded grace period.
    fn disconnect(&self) -> impl Future<Output = Result<()>> + Send;
}

/// A message received on a subscribed topic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    /// Topic the message was published to.
    pub topic: String,
    /// Message payload as raw bytes.
    pub payload: Vec<u8>,
}

impl InboundMessage {
    /// Create a new inbound message.
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Returns the payload as a UTF-8 string, if valid.
    pub fn payload_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.payload).ok()
    }
}
