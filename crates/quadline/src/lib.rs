//! # Quadline
//!
//! WebSocket server for a stake-based line-forming game: rooms of 2–4
//! players each bet a fixed stake on a 4×4 board; the first full row,
//! column, or diagonal takes the pot.
//!
//! The server crate owns the socket surface — accept loop, per-socket
//! gateway, and the catalog/user-store lookups — while the rules and
//! the per-room actors live in `quadline-room` and the wire shapes in
//! `quadline-protocol`.

mod directory;
mod error;
mod gateway;
mod server;

pub use directory::{
    DirectoryError, GameCatalog, MemoryCatalog, MemoryUsers, UserStore,
};
pub use error::QuadlineError;
pub use server::{QuadlineServer, QuadlineServerBuilder};
