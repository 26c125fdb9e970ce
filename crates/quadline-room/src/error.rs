//! Error types for the room layer.

use quadline_protocol::{PlayerId, RoomId};

use crate::board::BoardError;

/// Errors that can occur during room operations.
///
/// Validation and wrong-phase errors are returned to the single caller
/// and never mutate room state or trigger a broadcast.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist (or has already been evicted).
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// No free slot: the roster is at target, or the identity is
    /// already connected in this room.
    #[error("room {0} is full")]
    Full(RoomId),

    /// The room is past the joinable phases.
    #[error("room {0} is not joinable")]
    NotJoinable(RoomId),

    /// The identity is not on this room's roster.
    #[error("player {0} is not in room {1}")]
    NotMember(PlayerId, RoomId),

    /// A move arrived before the game started.
    #[error("room {0} has not started")]
    NotStarted(RoomId),

    /// A readiness signal arrived after the game started.
    #[error("room {0} has already started")]
    AlreadyStarted(RoomId),

    /// The move came from a player other than `current_turn`.
    #[error("it is not {0}'s turn")]
    NotYourTurn(PlayerId),

    /// The target cell is out of bounds or already claimed.
    #[error("invalid cell: {0}")]
    InvalidCell(#[from] BoardError),

    /// The game is over; no further moves or readiness changes.
    #[error("room {0} is finished")]
    Finished(RoomId),

    /// Room creation with a non-positive bet.
    #[error("bet must be positive")]
    InvalidBet,

    /// Room creation with a player count outside `2..=max_players`.
    #[error("player count {requested} outside 2..={max}")]
    InvalidPlayerCount { requested: usize, max: usize },

    /// The room's command channel is gone (actor stopped).
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}
