//! Room registry: creation, lookup, and idle eviction.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use quadline_protocol::{GameDefinition, Phase, RoomId};
use rand::Rng;

use crate::room::{spawn_room, RoomConfig, RoomHandle};
use crate::settlement::SettlementBridge;
use crate::RoomError;

/// Command channel depth for each room actor.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Random suffix bytes in a generated room id (hex-encoded, so twice
/// as many characters on the wire).
const ROOM_ID_BYTES: usize = 6;

/// Owns the map from room id to room handle.
///
/// The registry itself is not synchronized; the server wraps it in a
/// `tokio::sync::Mutex`. Room state never lives here — only handles —
/// so holding the lock never blocks on game logic.
pub struct RoomRegistry<S: SettlementBridge> {
    rooms: HashMap<RoomId, RoomHandle>,
    settlement: Arc<S>,
    idle_timeout: Duration,
}

impl<S: SettlementBridge> RoomRegistry<S> {
    /// Creates an empty registry. Rooms idle in a pre-game phase for
    /// longer than `idle_timeout` are cancelled by [`sweep`].
    ///
    /// [`sweep`]: RoomRegistry::sweep
    pub fn new(settlement: Arc<S>, idle_timeout: Duration) -> Self {
        Self {
            rooms: HashMap::new(),
            settlement,
            idle_timeout,
        }
    }

    /// Validates the stake and roster size against the game definition,
    /// then spawns a new room actor in the forming phase.
    pub fn create(
        &mut self,
        game: &GameDefinition,
        bet: u64,
        target_player_count: usize,
    ) -> Result<RoomId, RoomError> {
        if bet == 0 {
            return Err(RoomError::InvalidBet);
        }
        if target_player_count < 2 || target_player_count > game.max_players {
            return Err(RoomError::InvalidPlayerCount {
                requested: target_player_count,
                max: game.max_players,
            });
        }

        let room_id = self.generate_room_id(game);
        let handle = spawn_room(
            room_id.clone(),
            game.id,
            RoomConfig {
                bet,
                target_player_count,
            },
            Arc::clone(&self.settlement),
            DEFAULT_CHANNEL_SIZE,
        );
        self.rooms.insert(room_id.clone(), handle);

        tracing::info!(
            %room_id,
            game_id = %game.id,
            bet,
            target_player_count,
            "room created"
        );
        Ok(room_id)
    }

    /// Returns the handle for `room_id`, if the room is registered.
    pub fn lookup(&self, room_id: &RoomId) -> Result<RoomHandle, RoomError> {
        self.rooms
            .get(room_id)
            .cloned()
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))
    }

    /// Drops a room's handle. The actor task keeps running until its
    /// own loop exits; eviction just stops new lookups from finding it.
    pub fn evict(&mut self, room_id: &RoomId) -> bool {
        self.rooms.remove(room_id).is_some()
    }

    /// Number of registered rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Evicts dead rooms and cancels pre-game rooms idle past the
    /// timeout. Cancelled rooms broadcast to their connected players
    /// before the phase flips to closed.
    pub async fn sweep(&mut self) {
        let handles: Vec<RoomHandle> = self.rooms.values().cloned().collect();

        let mut evicted = 0usize;
        let mut cancelled = 0usize;
        for handle in handles {
            let info = match handle.info().await {
                Ok(info) => info,
                Err(_) => {
                    // Actor already gone.
                    self.rooms.remove(handle.room_id());
                    evicted += 1;
                    continue;
                }
            };

            if info.phase == Phase::Closed {
                self.rooms.remove(&info.room_id);
                evicted += 1;
            } else if info.phase.is_joinable() && info.idle > self.idle_timeout {
                handle.cancel("room timed out waiting for players").await;
                self.rooms.remove(&info.room_id);
                cancelled += 1;
            }
        }

        if evicted > 0 || cancelled > 0 {
            tracing::info!(
                evicted,
                cancelled,
                remaining = self.rooms.len(),
                "registry swept"
            );
        }
    }

    fn generate_room_id(&self, game: &GameDefinition) -> RoomId {
        let mut rng = rand::rng();
        loop {
            let suffix: String = (0..ROOM_ID_BYTES)
                .map(|_| format!("{:02x}", rng.random::<u8>()))
                .collect();
            let candidate = RoomId::new(format!("g{}-{}", game.id.0, suffix));
            if !self.rooms.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}
