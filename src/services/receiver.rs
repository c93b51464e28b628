//! Inbound command handling.
//!
//! Drains the channel the messaging link feeds, decodes each payload into an
//! [`InboundCommand`], and applies it to the shared state. The loop ends when
//! every sender has been dropped, which is how shutdown reaches it.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::command::InboundCommand;
use crate::state::{FanState, SharedControlState};
use crate::traits::{InboundMessage, VentDisplay};

/// Capacity of the link → receiver channel.
pub const INBOUND_CAPACITY: usize = 10;

/// Create the channel the link writes into and the receiver drains.
pub fn inbound_channel() -> (mpsc::Sender<InboundMessage>, mpsc::Receiver<InboundMessage>) {
    mpsc::channel(INBOUND_CAPACITY)
}

/// What applying one command did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Manual-fan flag set to the contained value.
    ModeChanged {
        /// New value of the manual-fan flag.
        manual_fan: bool,
    },
    /// Fan set to the contained state.
    FanSet(FanState),
    /// Fan command arrived while automatic control owns the fan.
    IgnoredInAutoMode,
    /// Payload was not a known command.
    Unrecognized,
}

/// Applies remote commands to the shared state.
pub struct CommandReceiver<D: VentDisplay> {
    state: Arc<SharedControlState>,
    display: Arc<D>,
}

impl<D: VentDisplay> CommandReceiver<D> {
    /// Create a receiver writing into `state` and reflecting mode changes on
    /// `display`.
    pub fn new(state: Arc<SharedControlState>, display: Arc<D>) -> Self {
        Self { state, display }
    }

    /// Apply one decoded command.
    pub fn apply(&self, command: &InboundCommand) -> CommandOutcome {
        match command {
            InboundCommand::ModeAuto => self.set_mode(false),
            InboundCommand::ModeManual => self.set_mode(true),
            InboundCommand::FanOn => self.set_fan(FanState::On),
            InboundCommand::FanOff => self.set_fan(FanState::Off),
            InboundCommand::Unrecognized(payload) => {
                debug!(payload = %payload, "ignoring unrecognized command");
                CommandOutcome::Unrecognized
            }
        }
    }

    fn set_mode(&self, manual_fan: bool) -> CommandOutcome {
        self.state.set_manual_fan(manual_fan);
        self.display.refresh_mode(self.state.modes());
        CommandOutcome::ModeChanged { manual_fan }
    }

    fn set_fan(&self, fan: FanState) -> CommandOutcome {
        if self.state.set_fan_manually(fan) {
            self.display.refresh_fan_state(fan);
            CommandOutcome::FanSet(fan)
        } else {
            debug!(%fan, "fan command ignored in auto mode");
            CommandOutcome::IgnoredInAutoMode
        }
    }

    /// Drain `inbound` until it closes.
    pub async fn run(self, mut inbound: mpsc::Receiver<InboundMessage>) {
        while let Some(message) = inbound.recv().await {
            info!(
                topic = %message.topic,
                payload = %String::from_utf8_lossy(&message.payload),
                "got update"
            );
            self.apply(&InboundCommand::decode(&message.payload));
        }
        debug!("inbound channel closed, command receiver exiting");
    }

    /// Run on a new task.
    pub fn spawn(self, inbound: mpsc::Receiver<InboundMessage>) -> JoinHandle<()> {
        tokio::spawn(self.run(inbound))
    }
}
