//! Settlement: moving the wager when a room finishes.
//!
//! The room actor never talks to the ledger directly — it goes through
//! the [`SettlementBridge`] trait, implemented in production by the
//! external ledger service and in tests and the demo binary by
//! [`MemoryLedger`]. The bridge is invoked at most once per room, on
//! the transition into the finished phase.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use quadline_protocol::PlayerId;

/// Errors from the ledger.
///
/// A settlement failure is logged and surfaced; it never rolls back the
/// game outcome. The game result is the source of truth and the ledger
/// retries independently.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettlementError {
    #[error("insufficient funds for {0}")]
    InsufficientFunds(PlayerId),

    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Applies a single balance delta for one player.
///
/// Implementations must be idempotent-friendly: the room guarantees at
/// most one settlement pass per room, but the ledger may still see the
/// same pass retried by its own infrastructure.
pub trait SettlementBridge: Send + Sync + 'static {
    /// Credits (`delta > 0`) or debits (`delta < 0`) a player's balance.
    fn credit_debit(
        &self,
        identity: PlayerId,
        delta: i64,
    ) -> impl Future<Output = Result<(), SettlementError>> + Send;
}

/// Computes the balance deltas for a finished room.
///
/// Every member of `stakers` put up `bet` when the game started. With a
/// winner, the winner collects every other staker's stake and each of
/// the others — forfeiters included — loses exactly `bet`. A draw moves
/// no money. The two-player case reduces to winner `+bet`, loser `-bet`.
pub fn payouts(
    winner: Option<PlayerId>,
    stakers: &[PlayerId],
    bet: u64,
) -> Vec<(PlayerId, i64)> {
    let Some(winner) = winner else {
        return Vec::new();
    };
    let bet = bet as i64;
    let losers: Vec<PlayerId> =
        stakers.iter().copied().filter(|p| *p != winner).collect();

    let mut deltas = Vec::with_capacity(losers.len() + 1);
    deltas.push((winner, bet * losers.len() as i64));
    deltas.extend(losers.into_iter().map(|p| (p, -bet)));
    deltas
}

/// An in-process ledger keyed by player identity.
///
/// Debits fail with [`SettlementError::InsufficientFunds`] when the
/// balance would go negative; credits always succeed and create the
/// account if needed.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    balances: Mutex<HashMap<PlayerId, i64>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a player's balance, creating the account if needed.
    pub fn deposit(&self, identity: PlayerId, amount: i64) {
        let mut balances = self.balances.lock().expect("ledger poisoned");
        *balances.entry(identity).or_insert(0) += amount;
    }

    /// Returns the player's balance, zero for unknown accounts.
    pub fn balance(&self, identity: PlayerId) -> i64 {
        self.balances
            .lock()
            .expect("ledger poisoned")
            .get(&identity)
            .copied()
            .unwrap_or(0)
    }
}

impl SettlementBridge for MemoryLedger {
    async fn credit_debit(
        &self,
        identity: PlayerId,
        delta: i64,
    ) -> Result<(), SettlementError> {
        let mut balances = self.balances.lock().expect("ledger poisoned");
        let balance = balances.entry(identity).or_insert(0);
        if *balance + delta < 0 {
            return Err(SettlementError::InsufficientFunds(identity));
        }
        *balance += delta;
        Ok(())
    }
}
