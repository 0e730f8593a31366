//! # Parlor
//!
//! A protocol bridge: one text-protocol chat client on one side, a
//! long-poll HTTP room service on the other. The client joins remote
//! rooms as if they were ordinary channels; Parlor holds a live
//! subscription per room and translates both directions.
//!
//! The pieces plug together at construction time — the room-service
//! client (a [`RoomService`](parlor_api::RoomService) implementation)
//! and the two halves of the client connection
//! ([`CommandStream`](parlor_transport::CommandStream) /
//! [`EventSink`](parlor_transport::EventSink)) are handed in, and
//! [`GatewaySession::run`] drives everything until the client leaves or
//! the upstream session dies.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use parlor::prelude::*;
//! # use std::sync::Arc;
//! # async fn example(service: Arc<impl RoomService>) {
//! let (commands_tx, commands, events, mut events_rx) = channel_transport();
//! let session = GatewaySession::new(GatewayConfig::default(), service, commands, events);
//! // feed commands_tx / read events_rx elsewhere, then:
//! let _ = session.run().await;
//! # }
//! ```

mod config;
mod error;
mod session;

pub use config::{GatewayConfig, GatewayConfigBuilder};
pub use error::GatewayError;
pub use session::GatewaySession;

/// One-stop imports for embedding the gateway.
pub mod prelude {
    pub use crate::{GatewayConfig, GatewayError, GatewaySession};
    pub use parlor_api::{RoomService, ServiceError, Severity};
    pub use parlor_protocol::{
        ClientCommand, Identity, IdentityResolver, Outbound, SYSTEM_SENDER, Sender,
    };
    pub use parlor_transport::{CommandStream, EventSink, TransportError, channel_transport};
}
