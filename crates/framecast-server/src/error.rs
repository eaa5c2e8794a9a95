//! Error types for server operations.

use framecast_core::ClientId;
use framecast_protocol::InMessageKind;
use std::net::SocketAddr;
use thiserror::Error;

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors that can occur while running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind the listening socket.
    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// A handler is already registered for this `(kind, identifier)`.
    #[error("Duplicate {kind} handler for identifier '{identifier}'")]
    DuplicateHandler {
        kind: InMessageKind,
        identifier: String,
    },

    /// The session already runs a frame listener task.
    #[error("Session {0} is already listening to frames")]
    AlreadyListening(ClientId),

    /// Camera-level failure.
    #[error("Camera error: {0}")]
    Camera(#[from] framecast_camera::CameraError),

    /// Codec-level failure.
    #[error("Protocol error: {0}")]
    Protocol(#[from] framecast_core::Error),

    /// Low-level I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
