/// Errors that can occur at the client-connection seam.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was closed out from under us.
    #[error("connection closed: {0}")]
    Closed(String),

    /// Delivering an event failed.
    #[error("deliver failed: {0}")]
    DeliverFailed(String),
}
