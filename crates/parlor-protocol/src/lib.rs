//! Client-protocol surface for Parlor.
//!
//! The transport parses the client's wire protocol into [`ClientCommand`]
//! values and renders [`Outbound`] events back into wire lines; this
//! crate is the vocabulary shared by both sides. It also owns identity
//! resolution — the scheme that turns a remote occupant record into a
//! stable, collision-free local handle ([`IdentityResolver`]).

mod command;
mod event;
mod identity;

pub use command::ClientCommand;
pub use event::{Outbound, SYSTEM_SENDER, Sender};
pub use identity::{Identity, IdentityResolver};
