//! The room snapshot pushed to every connection, and the read-only
//! catalog shapes the server consumes.

use serde::{Deserialize, Serialize};

use crate::{GameId, Phase, PlayerId, RoomId};

/// One player's row in the roster, in join order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// The player's identity.
    pub identity: PlayerId,
    /// Display name resolved from the user store at connect time.
    pub display: String,
    /// Whether the player has signalled readiness.
    pub ready: bool,
    /// Whether the player's connection is live. A disconnected entry
    /// during an active game is a forfeiter whose turns are skipped.
    pub connected: bool,
}

/// The full state of a room as seen by clients.
///
/// Pushed to every connection in the room after each state change.
/// The board is a 4×4 grid of nullable owner ids; roster order is join
/// order, which is also turn order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub phase: Phase,
    pub roster: Vec<RosterEntry>,
    pub board: Vec<Vec<Option<PlayerId>>>,
    /// The player allowed to move; `None` outside `in_progress`.
    pub current_turn: Option<PlayerId>,
    /// Set only on a decisive or forfeit outcome; absent on a draw.
    pub winner: Option<PlayerId>,
}

/// A catalog entry describing one playable game.
///
/// Created and edited by the catalog/admin service; the room layer
/// reads it once at room creation and never writes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameDefinition {
    pub id: GameId,
    pub title: String,
    pub description: String,
    /// Currency unit the bet is denominated in.
    pub stake_unit: String,
    /// Upper bound on `target_player_count` for rooms of this game.
    pub max_players: usize,
    /// Advertised transport endpoint for clients.
    pub endpoint: String,
}

/// Display fields for one user, resolved from the external user store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub identity: PlayerId,
    pub display: String,
}
