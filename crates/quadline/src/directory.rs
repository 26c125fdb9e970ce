//! Read-only lookups against the game catalog and user store.
//!
//! Both live in an external service in production; the server only
//! needs two lookups, expressed as traits so tests and the demo binary
//! can run against the in-memory implementations.

use std::collections::HashMap;
use std::future::Future;

use quadline_protocol::{GameDefinition, GameId, PlayerId, UserProfile};

/// Errors from catalog and user-store lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    #[error("game {0} not found")]
    GameNotFound(GameId),

    #[error("user {0} not found")]
    UserNotFound(PlayerId),

    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Resolves a catalog game by id, for room-creation validation.
pub trait GameCatalog: Send + Sync + 'static {
    fn game_by_id(
        &self,
        id: GameId,
    ) -> impl Future<Output = Result<GameDefinition, DirectoryError>> + Send;
}

/// Resolves a player's display profile at connect time.
pub trait UserStore: Send + Sync + 'static {
    fn profile(
        &self,
        identity: PlayerId,
    ) -> impl Future<Output = Result<UserProfile, DirectoryError>> + Send;
}

/// A fixed in-memory catalog, populated before the server starts.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    games: HashMap<GameId, GameDefinition>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, game: GameDefinition) {
        self.games.insert(game.id, game);
    }
}

impl GameCatalog for MemoryCatalog {
    async fn game_by_id(
        &self,
        id: GameId,
    ) -> Result<GameDefinition, DirectoryError> {
        self.games
            .get(&id)
            .cloned()
            .ok_or(DirectoryError::GameNotFound(id))
    }
}

/// A fixed in-memory user store, populated before the server starts.
#[derive(Debug, Default)]
pub struct MemoryUsers {
    users: HashMap<PlayerId, UserProfile>,
}

impl MemoryUsers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, profile: UserProfile) {
        self.users.insert(profile.identity, profile);
    }
}

impl UserStore for MemoryUsers {
    async fn profile(
        &self,
        identity: PlayerId,
    ) -> Result<UserProfile, DirectoryError> {
        self.users
            .get(&identity)
            .cloned()
            .ok_or(DirectoryError::UserNotFound(identity))
    }
}
