//! Error types for the room-service boundary.

/// Error code the service returns when the authenticated session itself
/// has been invalidated. Every ticket issued under it is dead too.
pub const CODE_INVALID_SESSION: u32 = 102;

/// Error code the service returns when a single room ticket has been
/// invalidated. The session and other rooms' tickets are unaffected.
pub const CODE_INVALID_TICKET: u32 = 109;

/// A failure reported by the room-service client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ServiceError {
    /// The service answered with a structured error. `code` is the
    /// service's numeric error code; two of them
    /// ([`CODE_INVALID_SESSION`], [`CODE_INVALID_TICKET`]) are
    /// load-bearing for recovery, the rest are opaque.
    #[error("api error {code}: {message}")]
    Api { code: u32, message: String },

    /// The call never produced a structured answer: connection trouble,
    /// a timeout, or a response that failed to parse.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// How a failure should be handled, from the gateway's point of view.
///
/// ```text
/// FatalSession → tear down the whole gateway session, all rooms
/// FatalRoom    → synthesize a part for the one affected room
/// Transient    → log, back off, retry; never surfaced to the client
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    FatalSession,
    FatalRoom,
    Transient,
}

impl ServiceError {
    /// Shorthand for a structured API error.
    pub fn api(code: u32, message: impl Into<String>) -> Self {
        Self::Api {
            code,
            message: message.into(),
        }
    }

    /// Classifies this failure for the recovery policy.
    ///
    /// Anything that is not one of the two load-bearing codes is
    /// transient by definition: the room stays joined and the caller
    /// retries on its next natural iteration.
    pub fn severity(&self) -> Severity {
        match self {
            Self::Api {
                code: CODE_INVALID_SESSION,
                ..
            } => Severity::FatalSession,
            Self::Api {
                code: CODE_INVALID_TICKET,
                ..
            } => Severity::FatalRoom,
            Self::Api { .. } | Self::Transport(_) => Severity::Transient,
        }
    }
}
