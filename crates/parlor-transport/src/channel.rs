//! In-memory transport backed by unbounded channels.
//!
//! Stands in for a real connection in tests and the demo: the test
//! pushes [`ClientCommand`]s into one end and reads delivered
//! [`Outbound`] events from the other.

use tokio::sync::mpsc;

use parlor_protocol::{ClientCommand, Outbound};

use crate::{CommandStream, EventSink, TransportError};

/// Creates a paired in-memory transport.
///
/// Returns `(command_tx, commands, events, event_rx)`: the gateway is
/// handed `commands` and `events`, while the caller keeps `command_tx`
/// to play the client's side and `event_rx` to observe what the client
/// would have received. Dropping `command_tx` reads as a clean
/// disconnect.
pub fn channel_transport() -> (
    mpsc::UnboundedSender<ClientCommand>,
    ChannelCommandStream,
    ChannelEventSink,
    mpsc::UnboundedReceiver<Outbound>,
) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    (
        command_tx,
        ChannelCommandStream { rx: command_rx },
        ChannelEventSink { tx: event_tx },
        event_rx,
    )
}

/// Inbound half of [`channel_transport`].
pub struct ChannelCommandStream {
    rx: mpsc::UnboundedReceiver<ClientCommand>,
}

impl CommandStream for ChannelCommandStream {
    async fn next_command(&mut self) -> Result<Option<ClientCommand>, TransportError> {
        // All senders dropped == the client hung up cleanly.
        Ok(self.rx.recv().await)
    }
}

/// Outbound half of [`channel_transport`].
pub struct ChannelEventSink {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl EventSink for ChannelEventSink {
    async fn deliver(&mut self, event: Outbound) -> Result<(), TransportError> {
        self.tx
            .send(event)
            .map_err(|e| TransportError::DeliverFailed(e.to_string()))
    }
}

// =========================================================================
// Tests
// =========================================================================
