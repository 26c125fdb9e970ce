//! Frame grammar: the hello messages, in-game text frames, and server
//! replies.
//!
//! A connection speaks two dialects in sequence. The first frame(s) are
//! JSON [`ClientHello`] messages (create a room, or connect to one).
//! Once connected, the client sends bare text frames — `ready`,
//! `not_ready`, or `<row>,<col>` in ASCII decimal — parsed by
//! [`ClientFrame`]. Everything the server sends is a JSON
//! [`ServerMessage`].

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{GameId, PlayerId, ProtocolError, RoomId, RoomSnapshot};

/// The first message(s) a client sends after the socket opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientHello {
    /// Ask the server to create a room for a catalog game.
    Create {
        game_id: GameId,
        bet: u64,
        count_players: usize,
    },

    /// Bind this connection to a room under a claimed identity.
    Connect {
        room_id: RoomId,
        identity: PlayerId,
    },
}

/// An in-game frame, parsed from a bare text message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientFrame {
    Ready,
    NotReady,
    Move { row: usize, col: usize },
}

impl FromStr for ClientFrame {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "ready" => return Ok(Self::Ready),
            "not_ready" => return Ok(Self::NotReady),
            _ => {}
        }

        let (row, col) = s
            .split_once(',')
            .ok_or_else(|| ProtocolError::BadFrame(s.to_string()))?;
        let row = row
            .trim()
            .parse::<usize>()
            .map_err(|_| ProtocolError::BadFrame(s.to_string()))?;
        let col = col
            .trim()
            .parse::<usize>()
            .map_err(|_| ProtocolError::BadFrame(s.to_string()))?;
        Ok(Self::Move { row, col })
    }
}

/// Everything the server pushes to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Reply to [`ClientHello::Create`].
    Created { room_id: RoomId },

    /// Full room state, pushed on every state change.
    Snapshot(RoomSnapshot),

    /// The registry cancelled the room (idle timeout) before it started.
    Cancelled { reason: String },

    /// A request failed. Sent only to the requesting connection; the
    /// room state is unchanged. `code` follows HTTP conventions.
    Error { code: u16, message: String },
}
