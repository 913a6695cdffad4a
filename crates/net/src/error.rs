//! Network error types

use std::io;

use crate::protocol::ErrorCode;

/// Network result type
pub type Result<T> = std::result::Result<T, Error>;

/// Network errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Connection rejected: {0}")]
    Rejected(String),

    #[error("Timed out waiting for the server")]
    Timeout,

    /// The server answered a request with an error reply
    #[error("{code}: {message}")]
    Remote { code: ErrorCode, message: String },

    #[error(transparent)]
    Core(#[from] venue_core::Error),
}
