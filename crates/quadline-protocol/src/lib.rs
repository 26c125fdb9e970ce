//! Wire protocol for Quadline.
//!
//! Everything a client and server exchange is defined here:
//!
//! - **Identity** ([`PlayerId`], [`GameId`], [`RoomId`]) and the room
//!   lifecycle [`Phase`].
//! - **Frames** ([`ClientHello`], [`ClientFrame`], [`ServerMessage`]) —
//!   the JSON hello/reply messages and the plain-text in-game frames.
//! - **Snapshots** ([`RoomSnapshot`]) — the full-state document pushed
//!   to every connection on every room change.
//! - **Catalog shapes** ([`GameDefinition`], [`UserProfile`]) — the
//!   read-only records the server consumes from the catalog service.
//!
//! The protocol layer knows nothing about sockets or rooms; it only
//! defines shapes and how to parse them.

mod error;
mod frames;
mod ids;
mod snapshot;

pub use error::ProtocolError;
pub use frames::{ClientFrame, ClientHello, ServerMessage};
pub use ids::{GameId, Phase, PlayerId, RoomId};
pub use snapshot::{GameDefinition, RoomSnapshot, RosterEntry, UserProfile};
