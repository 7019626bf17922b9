//! Server error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen socket could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// The accept loop failed in a way it cannot recover from.
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),
}
