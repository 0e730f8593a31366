//! Client-connection seam for Parlor.
//!
//! The text-protocol connection object — the thing that owns the socket,
//! parses the wire grammar, and frames replies — is an external
//! collaborator. This crate defines the two halves the gateway talks to:
//!
//! - [`CommandStream`] — the inbound half, yielding parsed
//!   [`ClientCommand`]s until the client goes away
//! - [`EventSink`] — the outbound half, accepting [`Outbound`] events
//!   for framing and delivery
//!
//! They are separate traits because the gateway drives them from one
//! `select!` loop: reads race against the shared outbound channel, and
//! all writes funnel through the single sink the loop owns — which is
//! what serializes concurrent rooms' output onto one connection.
//!
//! [`channel_transport`] provides the in-memory implementation used by
//! tests and the demo.

#![allow(async_fn_in_trait)]

mod channel;
mod error;

pub use channel::{ChannelCommandStream, ChannelEventSink, channel_transport};
pub use error::TransportError;

use parlor_protocol::{ClientCommand, Outbound};

/// The inbound half of a client connection.
pub trait CommandStream: Send + 'static {
    /// Waits for the next command from the client.
    ///
    /// Returns `Ok(None)` when the connection closed cleanly; after
    /// that, the stream is exhausted.
    fn next_command(
        &mut self,
    ) -> impl Future<Output = Result<Option<ClientCommand>, TransportError>> + Send;
}

/// The outbound half of a client connection.
pub trait EventSink: Send + 'static {
    /// Frames and delivers one event to the client.
    fn deliver(&mut self, event: Outbound)
    -> impl Future<Output = Result<(), TransportError>> + Send;
}
