//! Room actor: an isolated Tokio task that owns one play session.
//!
//! Every room runs in its own task and owns all of its mutable state:
//! roster, readiness, turn pointer, board, and outcome. The outside
//! world only holds a [`RoomHandle`] and talks over an mpsc channel, so
//! `join`, `set_ready`, `play`, and `disconnect` are serialized by
//! construction — no two mutations ever interleave, and a snapshot read
//! always observes a consistent post-mutation state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use quadline_protocol::{GameId, Phase, PlayerId, RoomId, RoomSnapshot, RosterEntry};
use rand::Rng;
use tokio::sync::{mpsc, oneshot};

use crate::board::{Board, Verdict};
use crate::settlement::{payouts, SettlementBridge};
use crate::RoomError;

/// An outbound event from the room actor to one player's gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// Full state snapshot, pushed after every state change.
    Snapshot(RoomSnapshot),
    /// The registry cancelled the room before it started.
    Cancelled { reason: String },
}

/// Channel sender for delivering events to a player's gateway.
pub type PlayerSender = mpsc::UnboundedSender<RoomEvent>;

/// Per-room settings fixed at creation.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Stake per player, in the game's currency unit. Always positive.
    pub bet: u64,
    /// Roster size required to start. At least 2.
    pub target_player_count: usize,
}

/// Commands sent to a room actor through its channel.
///
/// Variants with a `oneshot::Sender` are request/response: the caller
/// awaits the reply. `Disconnect` and `Cancel` are fire-and-forget.
pub(crate) enum RoomCommand {
    Join {
        identity: PlayerId,
        display: String,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    SetReady {
        identity: PlayerId,
        ready: bool,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Play {
        identity: PlayerId,
        row: usize,
        col: usize,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Disconnect {
        identity: PlayerId,
    },
    Snapshot {
        reply: oneshot::Sender<RoomSnapshot>,
    },
    Info {
        reply: oneshot::Sender<RoomInfo>,
    },
    Cancel {
        reason: String,
    },
}

/// Room metadata for the registry's sweep (not the full game state).
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub phase: Phase,
    pub roster_len: usize,
    pub target_player_count: usize,
    /// Time since the last mutating command. Read-only queries do not
    /// reset this, otherwise the sweep would keep every room alive.
    pub idle: Duration,
}

/// Handle to a running room actor. Cheap to clone; the registry holds
/// one per room and every gateway in the room holds a copy.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Returns the room's identifier.
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Adds (or reactivates) a player on the roster.
    pub async fn join(
        &self,
        identity: PlayerId,
        display: String,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Join {
            identity,
            display,
            sender,
            reply: reply_tx,
        })
        .await?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?
    }

    /// Updates a player's readiness flag.
    pub async fn set_ready(
        &self,
        identity: PlayerId,
        ready: bool,
    ) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::SetReady {
            identity,
            ready,
            reply: reply_tx,
        })
        .await?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?
    }

    /// Plays a move at `(row, col)` for `identity`.
    pub async fn play(
        &self,
        identity: PlayerId,
        row: usize,
        col: usize,
    ) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Play {
            identity,
            row,
            col,
            reply: reply_tx,
        })
        .await?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?
    }

    /// Reports that the player's connection is gone. Idempotent; a
    /// no-op error if the room is already down.
    pub async fn disconnect(&self, identity: PlayerId) {
        let _ = self
            .sender
            .send(RoomCommand::Disconnect { identity })
            .await;
    }

    /// Requests a consistent snapshot of the room.
    pub async fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Snapshot { reply: reply_tx }).await?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }

    /// Requests room metadata for the sweep.
    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Info { reply: reply_tx }).await?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }

    /// Cancels a room that never started, notifying connected parties.
    pub async fn cancel(&self, reason: impl Into<String>) {
        let _ = self
            .sender
            .send(RoomCommand::Cancel {
                reason: reason.into(),
            })
            .await;
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }
}

/// One roster slot. Position in the roster vector is join order, which
/// is also turn order.
struct Seat {
    identity: PlayerId,
    display: String,
    ready: bool,
    connected: bool,
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor<S: SettlementBridge> {
    room_id: RoomId,
    game_id: GameId,
    config: RoomConfig,
    phase: Phase,
    roster: Vec<Seat>,
    board: Board,
    current_turn: Option<PlayerId>,
    winner: Option<PlayerId>,
    /// Identities that staked `bet` when the game started.
    stakers: Vec<PlayerId>,
    move_count: u32,
    settled: bool,
    senders: HashMap<PlayerId, PlayerSender>,
    settlement: Arc<S>,
    last_activity: Instant,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl<S: SettlementBridge> RoomActor<S> {
    /// Runs the actor loop until the room closes or is cancelled.
    async fn run(mut self) {
        tracing::info!(
            room_id = %self.room_id,
            game_id = %self.game_id,
            bet = self.config.bet,
            target = self.config.target_player_count,
            "room opened"
        );

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Join {
                    identity,
                    display,
                    sender,
                    reply,
                } => {
                    self.last_activity = Instant::now();
                    let result = self.handle_join(identity, display, sender);
                    let _ = reply.send(result);
                }
                RoomCommand::SetReady {
                    identity,
                    ready,
                    reply,
                } => {
                    self.last_activity = Instant::now();
                    let result = self.handle_set_ready(identity, ready);
                    let _ = reply.send(result);
                }
                RoomCommand::Play {
                    identity,
                    row,
                    col,
                    reply,
                } => {
                    self.last_activity = Instant::now();
                    let result = self.handle_play(identity, row, col);
                    let _ = reply.send(result);
                }
                RoomCommand::Disconnect { identity } => {
                    self.last_activity = Instant::now();
                    self.handle_disconnect(identity);
                }
                RoomCommand::Snapshot { reply } => {
                    let _ = reply.send(self.snapshot());
                }
                RoomCommand::Info { reply } => {
                    let _ = reply.send(self.info());
                }
                RoomCommand::Cancel { reason } => {
                    if !self.phase.is_over() {
                        tracing::info!(
                            room_id = %self.room_id,
                            %reason,
                            "room cancelled"
                        );
                        self.broadcast(RoomEvent::Cancelled { reason });
                        self.phase = Phase::Closed;
                    }
                }
            }

            if self.phase == Phase::Finished {
                self.settle_and_close().await;
            }
            if self.phase == Phase::Closed {
                break;
            }
        }

        // Dropping the senders ends every gateway's event stream.
        self.senders.clear();
        tracing::info!(room_id = %self.room_id, "room closed");
    }

    fn handle_join(
        &mut self,
        identity: PlayerId,
        display: String,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        if !self.phase.is_joinable() {
            return Err(RoomError::NotJoinable(self.room_id.clone()));
        }

        if let Some(seat) = self.roster.iter_mut().find(|s| s.identity == identity) {
            if seat.connected {
                return Err(RoomError::Full(self.room_id.clone()));
            }
            // Reactivate the slot; readiness does not survive a drop.
            seat.connected = true;
            seat.ready = false;
            seat.display = display;
        } else {
            if self.roster.len() >= self.config.target_player_count {
                return Err(RoomError::Full(self.room_id.clone()));
            }
            self.roster.push(Seat {
                identity,
                display,
                ready: false,
                connected: true,
            });
        }
        self.senders.insert(identity, sender);

        tracing::info!(
            room_id = %self.room_id,
            %identity,
            roster = self.roster.len(),
            "player joined"
        );

        if self.phase == Phase::Forming
            && self.roster.len() == self.config.target_player_count
        {
            self.phase = Phase::ReadyCheck;
            tracing::info!(room_id = %self.room_id, "roster full, ready check");
        }

        self.broadcast_snapshot();
        Ok(())
    }

    fn handle_set_ready(
        &mut self,
        identity: PlayerId,
        ready: bool,
    ) -> Result<(), RoomError> {
        match self.phase {
            Phase::Forming | Phase::ReadyCheck => {}
            Phase::InProgress => {
                return Err(RoomError::AlreadyStarted(self.room_id.clone()));
            }
            Phase::Finished | Phase::Closed => {
                return Err(RoomError::Finished(self.room_id.clone()));
            }
        }

        let seat = self
            .roster
            .iter_mut()
            .find(|s| s.identity == identity)
            .ok_or_else(|| RoomError::NotMember(identity, self.room_id.clone()))?;
        seat.ready = ready;

        // Joins and readiness signals may race; start only when the
        // roster is at target and unanimous.
        if self.roster.len() == self.config.target_player_count
            && self.roster.iter().all(|s| s.ready)
        {
            self.start_game();
        }

        self.broadcast_snapshot();
        Ok(())
    }

    fn start_game(&mut self) {
        self.phase = Phase::InProgress;
        self.board = Board::new();
        self.move_count = 0;
        self.stakers = self.roster.iter().map(|s| s.identity).collect();

        let opener = rand::rng().random_range(0..self.roster.len());
        self.current_turn = Some(self.roster[opener].identity);

        tracing::info!(
            room_id = %self.room_id,
            players = self.roster.len(),
            opener = %self.roster[opener].identity,
            "game started"
        );
    }

    fn handle_play(
        &mut self,
        identity: PlayerId,
        row: usize,
        col: usize,
    ) -> Result<(), RoomError> {
        match self.phase {
            Phase::InProgress => {}
            Phase::Forming | Phase::ReadyCheck => {
                return Err(RoomError::NotStarted(self.room_id.clone()));
            }
            Phase::Finished | Phase::Closed => {
                return Err(RoomError::Finished(self.room_id.clone()));
            }
        }
        if !self.roster.iter().any(|s| s.identity == identity) {
            return Err(RoomError::NotMember(identity, self.room_id.clone()));
        }
        if self.current_turn != Some(identity) {
            return Err(RoomError::NotYourTurn(identity));
        }

        self.board.place(row, col, identity, self.move_count + 1)?;
        self.move_count += 1;

        match self.board.evaluate() {
            Verdict::Win { owner, line } => {
                self.finish(Some(owner));
                tracing::info!(
                    room_id = %self.room_id,
                    winner = %owner,
                    ?line,
                    "game won"
                );
            }
            Verdict::Draw => {
                self.finish(None);
                tracing::info!(room_id = %self.room_id, "game drawn");
            }
            Verdict::Ongoing => self.advance_turn(),
        }

        self.broadcast_snapshot();
        Ok(())
    }

    fn handle_disconnect(&mut self, identity: PlayerId) {
        self.senders.remove(&identity);

        match self.phase {
            Phase::Forming | Phase::ReadyCheck => {
                let before = self.roster.len();
                self.roster.retain(|s| s.identity != identity);
                if self.roster.len() == before {
                    return;
                }
                // The slot is free again for a new joiner.
                if self.phase == Phase::ReadyCheck
                    && self.roster.len() < self.config.target_player_count
                {
                    self.phase = Phase::Forming;
                }
                tracing::info!(
                    room_id = %self.room_id,
                    %identity,
                    roster = self.roster.len(),
                    "player left before start"
                );
                self.broadcast_snapshot();
            }
            Phase::InProgress => {
                let Some(seat) = self
                    .roster
                    .iter_mut()
                    .find(|s| s.identity == identity && s.connected)
                else {
                    return;
                };
                seat.connected = false;
                tracing::info!(
                    room_id = %self.room_id,
                    %identity,
                    "player forfeited"
                );

                let connected: Vec<PlayerId> = self
                    .roster
                    .iter()
                    .filter(|s| s.connected)
                    .map(|s| s.identity)
                    .collect();
                if let [winner] = connected[..] {
                    // Sole survivor wins regardless of the board.
                    self.finish(Some(winner));
                    tracing::info!(
                        room_id = %self.room_id,
                        winner = %winner,
                        "won by forfeit"
                    );
                } else if self.current_turn == Some(identity) {
                    // Game continues; skip the forfeiter's turns.
                    self.advance_turn();
                }
                self.broadcast_snapshot();
            }
            Phase::Finished | Phase::Closed => {
                if let Some(seat) = self
                    .roster
                    .iter_mut()
                    .find(|s| s.identity == identity)
                {
                    seat.connected = false;
                }
            }
        }
    }

    /// Advances `current_turn` to the next connected roster member in
    /// join order, wrapping. Callers guarantee at least one connected
    /// member remains.
    fn advance_turn(&mut self) {
        let Some(current) = self.current_turn else {
            return;
        };
        let len = self.roster.len();
        let at = self
            .roster
            .iter()
            .position(|s| s.identity == current)
            .unwrap_or(0);
        for step in 1..=len {
            let seat = &self.roster[(at + step) % len];
            if seat.connected {
                self.current_turn = Some(seat.identity);
                return;
            }
        }
    }

    fn finish(&mut self, winner: Option<PlayerId>) {
        self.phase = Phase::Finished;
        self.winner = winner;
        self.current_turn = None;
    }

    /// Runs settlement at most once, then closes the room.
    ///
    /// The finished snapshot has already gone out from the handler that
    /// made the transition; this broadcasts the closed snapshot after
    /// the ledger calls complete.
    async fn settle_and_close(&mut self) {
        if !self.settled {
            self.settled = true;
            for (who, delta) in
                payouts(self.winner, &self.stakers, self.config.bet)
            {
                if let Err(error) =
                    self.settlement.credit_debit(who, delta).await
                {
                    tracing::error!(
                        room_id = %self.room_id,
                        identity = %who,
                        delta,
                        %error,
                        "settlement failed"
                    );
                }
            }
            tracing::info!(
                room_id = %self.room_id,
                winner = ?self.winner,
                "room settled"
            );
        }

        self.phase = Phase::Closed;
        self.broadcast_snapshot();
    }

    fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.room_id.clone(),
            phase: self.phase,
            roster: self
                .roster
                .iter()
                .map(|s| RosterEntry {
                    identity: s.identity,
                    display: s.display.clone(),
                    ready: s.ready,
                    connected: s.connected,
                })
                .collect(),
            board: self.board.owner_grid(),
            current_turn: self.current_turn,
            winner: self.winner,
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.room_id.clone(),
            phase: self.phase,
            roster_len: self.roster.len(),
            target_player_count: self.config.target_player_count,
            idle: self.last_activity.elapsed(),
        }
    }

    fn broadcast_snapshot(&self) {
        self.broadcast(RoomEvent::Snapshot(self.snapshot()));
    }

    /// Fans an event out to every live sender. Dead receivers are
    /// dropped silently; their gateways are already gone.
    fn broadcast(&self, event: RoomEvent) {
        for sender in self.senders.values() {
            let _ = sender.send(event.clone());
        }
    }
}

/// Spawns a new room actor task and returns its handle.
pub(crate) fn spawn_room<S: SettlementBridge>(
    room_id: RoomId,
    game_id: GameId,
    config: RoomConfig,
    settlement: Arc<S>,
    channel_size: usize,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);

    let actor = RoomActor {
        room_id: room_id.clone(),
        game_id,
        config,
        phase: Phase::Forming,
        roster: Vec::new(),
        board: Board::new(),
        current_turn: None,
        winner: None,
        stakers: Vec::new(),
        move_count: 0,
        settled: false,
        senders: HashMap::new(),
        settlement,
        last_activity: Instant::now(),
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        sender: tx,
    }
}
