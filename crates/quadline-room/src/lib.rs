//! Game rules and session coordination for Quadline.
//!
//! The crate splits into four layers:
//!
//! - [`board`] — the pure 4×4 grid: claims, line detection, draws.
//! - [`room`] — one actor task per room, owning roster, readiness,
//!   turn order, and the board. All mutation flows through a
//!   [`RoomHandle`].
//! - [`registry`] — the map from room id to handle, with creation-time
//!   validation and idle-room eviction.
//! - [`settlement`] — the [`SettlementBridge`] seam to the ledger and
//!   the payout arithmetic.

pub mod board;
mod error;
mod registry;
mod room;
pub mod settlement;

pub use board::{Board, BoardError, Verdict, SIZE};
pub use error::RoomError;
pub use registry::RoomRegistry;
pub use room::{PlayerSender, RoomConfig, RoomEvent, RoomHandle, RoomInfo};
pub use settlement::{payouts, MemoryLedger, SettlementBridge, SettlementError};
