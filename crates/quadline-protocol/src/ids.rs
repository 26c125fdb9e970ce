//! Identity newtypes and the room lifecycle phase.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A unique identifier for a player.
///
/// Newtype over `u64` so a `PlayerId` can never be confused with a
/// `GameId` in a signature. `#[serde(transparent)]` keeps the JSON a
/// plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A unique identifier for a game definition in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub u64);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G-{}", self.0)
    }
}

/// A globally unique room identifier.
///
/// Derived at creation from the game id plus a random token
/// (`g{game}-{hex}`), so it is a string rather than a number. Immutable
/// for the life of the room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Wraps an already-derived identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The lifecycle phase of a room.
///
/// ```text
/// Forming → ReadyCheck → InProgress → Finished → Closed
///     ↑         │
///     └─────────┘  (only when a leaver drops the roster below target)
/// ```
///
/// - **Forming**: accepting joins, roster below target.
/// - **ReadyCheck**: roster full; waiting for every member to signal
///   readiness. Still joinable in case a slot frees up.
/// - **InProgress**: the game is running; only `move` and `disconnect`
///   are meaningful.
/// - **Finished**: terminal outcome reached (win, draw, or forfeit);
///   settlement runs exactly once on this transition.
/// - **Closed**: settled and final snapshot sent; the room is about to
///   be evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Forming,
    ReadyCheck,
    InProgress,
    Finished,
    Closed,
}

impl Phase {
    /// Returns `true` if the room is accepting joins.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Forming | Self::ReadyCheck)
    }

    /// Returns `true` once a terminal outcome has been reached.
    pub fn is_over(&self) -> bool {
        matches!(self, Self::Finished | Self::Closed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forming => write!(f, "forming"),
            Self::ReadyCheck => write!(f, "ready_check"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Finished => write!(f, "finished"),
            Self::Closed => write!(f, "closed"),
        }
    }
}
