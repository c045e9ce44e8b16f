//! Error types for the watch binary.

/// Top-level error for the watch binary.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The `--hub` value is not a usable address.
    #[error("invalid hub address: {0}")]
    InvalidHub(String),

    /// The HTTP client could not be built.
    #[error("http error: {0}")]
    Http(String),

    /// The `WebSocket` connection failed mid-stream.
    #[error("connection error: {0}")]
    Connection(String),

    /// A frame from the hub was not a valid hub message.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Every reconnect attempt failed.
    #[error("gave up after {attempts} failed connection attempts")]
    ReconnectExhausted {
        /// Consecutive failed attempts.
        attempts: u32,
    },
}
