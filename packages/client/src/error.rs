//! Client error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The requested username is already connected.
    #[error("username '{0}' is already connected")]
    DuplicateUsername(String),

    /// The TCP connection could not be established or was lost.
    #[error("connection error: {0}")]
    Connection(String),

    /// The server closed the connection deliberately.
    #[error("kicked from the server: {0}")]
    Kicked(String),
}
