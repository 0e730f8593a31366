//! Room-service API contract for Parlor.
//!
//! The gateway never speaks HTTP itself. This crate pins down the boundary
//! it talks through instead:
//!
//! 1. **Records** — the structures the service returns, with their exact
//!    JSON shapes ([`MessageRecord`], [`OccupantRecord`], [`EnterResponse`],
//!    [`ObserveResponse`], …)
//! 2. **Operations** — the [`RoomService`] trait, one method per remote call
//! 3. **Failures** — [`ServiceError`] and the [`Severity`] classification
//!    that drives the gateway's recovery policy
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Observer / Gateway (above)  ← call RoomService, match on Severity
//!     ↕
//! API contract (this crate)  ← records, trait, error codes
//!     ↕
//! Concrete HTTP client (external)  ← implements RoomService
//! ```

#![allow(async_fn_in_trait)]

mod error;
mod records;
mod service;

pub use error::{CODE_INVALID_SESSION, CODE_INVALID_TICKET, Severity, ServiceError};
pub use records::{
    EnterResponse, MessageKind, MessageRecord, ObserveResponse, OccupantRecord, OwnIdentity,
    RoomDescriptor,
};
pub use service::RoomService;
