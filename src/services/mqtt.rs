//! MQTT messaging link backed by `rumqttc`.
//!
//! **Publish Topics:**
//! - `<prefix>/air_quality` - Current reading as a decimal string (QoS 2)
//!
//! **Subscribe Topics:**
//! - `<prefix>/update` - Remote commands, forwarded raw to the inbound channel
//!
//! The companion console uses the same link with the topics swapped.
//!
//! # Lifecycle
//!
//! `connect()` builds a fresh client and event loop, spawns a task that polls
//! the loop, and waits (bounded by `connect_timeout_ms`) for the broker's
//! CONNACK. The subscription is issued on every CONNACK, so it survives the
//! event loop's own reconnects. `disconnect()` unsubscribes, sends DISCONNECT,
//! and gives the event loop `disconnect_grace_ms` to drain before aborting it.
//!
//! ```ignore
//! let (tx, rx) = inbound_channel();
//! let link = Arc::new(MqttLink::new(config.mqtt.clone(), config.mqtt.update_topic(), tx));
//!
//! link.connect().await?;
//! link.publish(&config.mqtt.air_quality_topic(), b"1100".to_vec()).await?;
//! link.disconnect().await?;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rumqttc::{
    AsyncClient, ConnectionError, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::MqttConfig;
use crate::error::{Result, VentError};
use crate::traits::{InboundMessage, MessagingLink};

/// Capacity of the client → event loop request queue.
const REQUEST_CAPACITY: usize = 10;

/// Pause between event-loop reconnect attempts after the link was up.
const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

struct Session {
    client: AsyncClient,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// MQTT implementation of [`MessagingLink`].
pub struct MqttLink {
    config: MqttConfig,
    subscribe_topic: String,
    inbound: mpsc::Sender<InboundMessage>,
    connected: Arc<AtomicBool>,
    session: tokio::sync::Mutex<Option<Session>>,
    // Publish path; cloned out so the lock is never held across an await
    client: Mutex<Option<AsyncClient>>,
}

impl MqttLink {
    /// Create a disconnected link.
    ///
    /// Messages arriving on `subscribe_topic` are forwarded to `inbound`.
    pub fn new(
        config: MqttConfig,
        subscribe_topic: impl Into<String>,
        inbound: mpsc::Sender<InboundMessage>,
    ) -> Self {
        Self {
            config,
            subscribe_topic: subscribe_topic.into(),
            inbound,
            connected: Arc::new(AtomicBool::new(false)),
            session: tokio::sync::Mutex::new(None),
            client: Mutex::new(None),
        }
    }

    /// Broker configuration.
    pub fn config(&self) -> &MqttConfig {
        &self.config
    }

    /// Topic this link subscribes to.
    pub fn subscribe_topic(&self) -> &str {
        &self.subscribe_topic
    }

    fn options(&self) -> MqttOptions {
        let config = &self.config;
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(Duration::from_secs(u64::from(config.keep_alive_secs)));
        if config.has_auth() {
            options.set_credentials(&config.username, &config.password);
        }
        options
    }

    fn current_client(&self) -> Option<AsyncClient> {
        self.client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_client(&self, client: Option<AsyncClient>) {
        *self.client.lock().unwrap_or_else(PoisonError::into_inner) = client;
    }
}

impl MessagingLink for MqttLink {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        let Some(client) = self.current_client() else {
            return Err(VentError::NotConnected);
        };
        if !self.is_connected() {
            return Err(VentError::NotConnected);
        }
        client
            .publish(topic, QoS::ExactlyOnce, false, payload)
            .await
            .map_err(|e| VentError::Publish(e.to_string()))
    }

    async fn connect(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        if session.is_some() && self.is_connected() {
            return Ok(());
        }
        if let Some(stale) = session.take() {
            stale.cancel.cancel();
            stale.task.abort();
        }

        let (client, eventloop) = AsyncClient::new(self.options(), REQUEST_CAPACITY);
        let (ready_tx, ready_rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        let events = SessionEvents {
            client: client.clone(),
            topic: self.subscribe_topic.clone(),
            connected: Arc::clone(&self.connected),
            ready: Some(ready_tx),
        };
        let task = tokio::spawn(drive(eventloop, events, self.inbound.clone(), cancel.clone()));

        let timeout = self.config.connect_timeout();
        let outcome = match time::timeout(timeout, ready_rx).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(reason))) => Err(VentError::Connect(reason)),
            Ok(Err(_)) => Err(VentError::Connect("event loop exited".to_string())),
            Err(_) => Err(VentError::Connect(format!("no CONNACK within {timeout:?}"))),
        };

        match outcome {
            Ok(()) => {
                info!(
                    host = %self.config.host,
                    port = self.config.port,
                    topic = %self.subscribe_topic,
                    "connected to mqtt server"
                );
                self.set_client(Some(client.clone()));
                *session = Some(Session {
                    client,
                    cancel,
                    task,
                });
                Ok(())
            }
            Err(e) => {
                cancel.cancel();
                task.abort();
                self.connected.store(false, Ordering::Release);
                warn!(host = %self.config.host, port = self.config.port, error = %e, "mqtt connect failed");
                Err(e)
            }
        }
    }

    async fn disconnect(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        let Some(mut active) = session.take() else {
            return Ok(());
        };
        self.set_client(None);

        // Teardown always completes; the first queueing failure is reported
        let mut failure = None;
        if self.is_connected() {
            if let Err(e) = active.client.try_unsubscribe(self.subscribe_topic.clone()) {
                failure = Some(VentError::Unsubscribe(e.to_string()));
            }
            if let Err(e) = active.client.try_disconnect() {
                failure.get_or_insert(VentError::Disconnect(e.to_string()));
            }
        }

        let grace = self.config.disconnect_grace();
        if time::timeout(grace, &mut active.task).await.is_err() {
            debug!(?grace, "event loop still running after grace period, aborting");
            active.task.abort();
        }
        active.cancel.cancel();
        self.connected.store(false, Ordering::Release);
        info!("disconnected from mqtt server");
        failure.map_or(Ok(()), Err)
    }
}

impl Drop for MqttLink {
    fn drop(&mut self) {
        if let Some(active) = self.session.get_mut().take() {
            active.cancel.cancel();
            active.task.abort();
        }
    }
}

/// What the event-loop task does after one event.
#[derive(Debug, PartialEq)]
enum Step {
    Continue,
    Forward(InboundMessage),
    Backoff,
    Stop,
}

/// Event handling for one broker session, kept apart from the polling task.
struct SessionEvents {
    client: AsyncClient,
    topic: String,
    connected: Arc<AtomicBool>,
    // Completes the pending `connect()` on the first CONNACK or error
    ready: Option<oneshot::Sender<core::result::Result<(), String>>>,
}

impl SessionEvents {
    fn handle(&mut self, event: core::result::Result<Event, ConnectionError>) -> Step {
        match event {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                self.connected.store(true, Ordering::Release);
                if let Err(e) = self.client.try_subscribe(self.topic.clone(), QoS::ExactlyOnce) {
                    let e = VentError::Subscribe(e.to_string());
                    warn!(error = %e, topic = %self.topic, "inbound commands unavailable");
                }
                match self.ready.take() {
                    Some(ready) => {
                        let _ = ready.send(Ok(()));
                    }
                    None => info!("reconnected to mqtt server"),
                }
                Step::Continue
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => Step::Forward(InboundMessage::new(
                publish.topic,
                publish.payload.to_vec(),
            )),
            Ok(Event::Outgoing(Outgoing::Disconnect)) => Step::Stop,
            Ok(_) => Step::Continue,
            Err(e) => {
                self.connected.store(false, Ordering::Release);
                if let Some(ready) = self.ready.take() {
                    let _ = ready.send(Err(e.to_string()));
                    return Step::Stop;
                }
                warn!(error = %e, "mqtt connection error");
                Step::Backoff
            }
        }
    }
}

/// Poll the event loop until cancelled or the broker session is closed.
async fn drive(
    mut eventloop: EventLoop,
    mut events: SessionEvents,
    inbound: mpsc::Sender<InboundMessage>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = eventloop.poll() => event,
        };

        match events.handle(event) {
            Step::Continue => {}
            Step::Forward(message) => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    sent = inbound.send(message) => {
                        if sent.is_err() {
                            debug!("inbound channel closed, dropping message");
                        }
                    }
                }
            }
            Step::Backoff => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = time::sleep(RECONNECT_BACKOFF) => {}
                }
            }
            Step::Stop => break,
        }
    }

    events.connected.store(false, Ordering::Release);
}
