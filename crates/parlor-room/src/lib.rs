//! Per-room bridging engine for Parlor.
//!
//! Each joined room runs as an isolated Tokio task (the observer) that
//! owns the room's state and repeatedly long-polls the service,
//! translating whatever comes back into outbound protocol events.
//!
//! # Key types
//!
//! - [`RoomState`] — cursor, ticket, dedup watermark, roster
//! - [`translate`]/[`reconcile_snapshot`] — remote event → outbound events
//! - [`Backoff`] — bounded exponential retry delay with jitter
//! - [`enter`] — joins a room and spawns its observer
//! - [`RoomHandle`] — the gateway's grip on a running observer
//! - [`RoomSignal`] — what observers send back to the gateway loop

mod backoff;
mod observer;
mod state;
mod translate;

pub use backoff::Backoff;
pub use observer::{RoomHandle, RoomSignal, enter};
pub use state::{RoomState, SharedRoomState};
pub use translate::{reconcile_snapshot, translate};
