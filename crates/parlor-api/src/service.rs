//! The room-service client trait.
//!
//! Parlor doesn't implement the HTTP client itself — an implementation
//! of [`RoomService`] is handed in at construction. Production wraps the
//! real service; tests and the demo use scripted in-memory fakes. The
//! gateway's behavior is specified entirely against this trait.

use crate::{EnterResponse, ObserveResponse, OccupantRecord, OwnIdentity, ServiceError};

/// Authenticated client for the room service.
///
/// Methods return `impl Future + Send` (rather than plain `async fn`)
/// so generic callers can run them inside spawned tasks. Implementors
/// still just write `async fn`.
///
/// Session state (API keys, cookies, the authenticated session token)
/// lives inside the implementation; the gateway only sequences calls:
/// `create_session` → `login` → `fetch_own_identity` once, then
/// per-room `enter_room` / `observe_room` / `say` / `exit_room`.
pub trait RoomService: Send + Sync + 'static {
    /// Opens an anonymous session with the service.
    fn create_session(&self) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Authenticates the session against an account.
    fn login(
        &self,
        account: &str,
        password: &str,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Fetches the authenticated account's own identity record.
    fn fetch_own_identity(&self)
    -> impl Future<Output = Result<OwnIdentity, ServiceError>> + Send;

    /// Joins a room, optionally with a password, announcing `nick` as
    /// the desired display name. The returned ticket and counter seed
    /// the room's observe loop.
    fn enter_room(
        &self,
        room: &str,
        nick: &str,
        password: Option<&str>,
    ) -> impl Future<Output = Result<EnterResponse, ServiceError>> + Send;

    /// Long-polls one room for new events.
    ///
    /// Blocks server-side until something happens or the service's poll
    /// timeout elapses — callers should expect this to take tens of
    /// seconds and must not hold locks across it.
    fn observe_room(
        &self,
        ticket: &str,
        counter: u64,
    ) -> impl Future<Output = Result<ObserveResponse, ServiceError>> + Send;

    /// Posts a message to the room behind `ticket`.
    fn say(
        &self,
        ticket: &str,
        text: &str,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Fetches a fresh occupant snapshot for a room, outside the
    /// observe stream. Password-protected rooms need the password again.
    fn fetch_room_snapshot(
        &self,
        room_id: &str,
        password: Option<&str>,
    ) -> impl Future<Output = Result<Vec<OccupantRecord>, ServiceError>> + Send;

    /// Leaves the room behind `ticket`.
    fn exit_room(&self, ticket: &str) -> impl Future<Output = Result<(), ServiceError>> + Send;
}
