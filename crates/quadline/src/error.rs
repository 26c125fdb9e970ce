//! Unified error type for the server crate.

use quadline_protocol::ProtocolError;
use quadline_room::RoomError;

use crate::directory::DirectoryError;

/// Top-level error that wraps the layer-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts lower-layer errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum QuadlineError {
    /// Socket-level I/O (bind, accept).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// WebSocket-level failure (handshake, send, recv).
    #[error(transparent)]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// A malformed hello or in-game frame.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room operation was rejected.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// Catalog or user-store lookup failure.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}
