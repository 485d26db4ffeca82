use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

use crate::types::{ClientCommand, ClientEvent};

// The command queue stays small: a frontend that outruns the runtime should
// feel backpressure instead of piling up stale intents. The event side is
// wider because every subscriber shares one ring.
const COMMAND_BUFFER: usize = 64;
const EVENT_BUFFER: usize = 256;

/// Receiver half of the runtime's event broadcast.
pub type EventStream = broadcast::Receiver<ClientEvent>;

/// Errors returned by client channel operations.
#[derive(Debug, Error)]
pub enum ClientChannelError {
    /// The runtime's command loop has stopped.
    #[error("client runtime is no longer accepting commands")]
    CommandChannelClosed,
}

/// Command intake and event fan-out for one runtime instance.
///
/// Commands flow through a bounded mpsc queue into the runtime's single
/// consumer task, which is what serializes all state mutation. Events fan
/// out over a broadcast ring so any number of frontends can observe the
/// same session.
#[derive(Clone, Debug)]
pub struct ClientChannels {
    command_tx: mpsc::Sender<ClientCommand>,
    event_tx: broadcast::Sender<ClientEvent>,
}

impl ClientChannels {
    /// Create the channel pair, handing the command receiver to the caller
    /// for the runtime's consumer loop.
    pub fn new() -> (Self, mpsc::Receiver<ClientCommand>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (event_tx, _) = broadcast::channel(EVENT_BUFFER);

        (
            Self {
                command_tx,
                event_tx,
            },
            command_rx,
        )
    }

    /// Open a new event subscription. Only events emitted after this call
    /// are observed.
    pub fn subscribe(&self) -> EventStream {
        self.event_tx.subscribe()
    }

    /// Queue one command for the runtime, waiting for queue space.
    pub async fn send_command(&self, command: ClientCommand) -> Result<(), ClientChannelError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| ClientChannelError::CommandChannelClosed)
    }

    /// Publish an event to whoever is listening. With no subscribers the
    /// event is dropped: events describe state, and a late subscriber gets
    /// the next state change.
    pub fn emit(&self, event: ClientEvent) {
        let _ = self.event_tx.send(event);
    }
}
