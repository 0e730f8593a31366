//! Error type for a gateway session.

/// Why a gateway session ended (other than the client leaving).
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The client connection failed mid-session.
    #[error("transport: {0}")]
    Transport(#[from] parlor_transport::TransportError),

    /// A room-service call that the session can't survive failed —
    /// registration is the only such path; per-room and per-command
    /// failures are reported to the client instead.
    #[error("room service: {0}")]
    Service(#[from] parlor_api::ServiceError),

    /// The service voided the authenticated session; every room went
    /// with it.
    #[error("session invalidated by the room service")]
    SessionInvalidated,
}
