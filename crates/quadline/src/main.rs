//! Demo server: in-memory catalog, users, and ledger.
//!
//! Seeds one catalog game and eight funded players, then serves on
//! port 8087. Useful for poking at the protocol with a WebSocket
//! client; production deployments wire real catalog/user/ledger
//! services in instead.

use std::sync::Arc;

use quadline::{MemoryCatalog, MemoryUsers, QuadlineServer};
use quadline_protocol::{GameDefinition, GameId, PlayerId, UserProfile};
use quadline_room::MemoryLedger;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut catalog = MemoryCatalog::new();
    catalog.insert(GameDefinition {
        id: GameId(1),
        title: "Quadline".into(),
        description: "First full row, column, or diagonal on a 4x4 board \
                      takes the pot."
            .into(),
        stake_unit: "credits".into(),
        max_players: 4,
        endpoint: "ws://localhost:8087/ws".into(),
    });

    let mut users = MemoryUsers::new();
    let ledger = Arc::new(MemoryLedger::new());
    for id in 1..=8 {
        users.insert(UserProfile {
            identity: PlayerId(id),
            display: format!("player-{id}"),
        });
        ledger.deposit(PlayerId(id), 1000);
    }

    let server = QuadlineServer::<MemoryCatalog, MemoryUsers, MemoryLedger>::builder()
        .bind("0.0.0.0:8087")
        .build(catalog, users, ledger)
        .await?;
    server.run().await?;
    Ok(())
}
