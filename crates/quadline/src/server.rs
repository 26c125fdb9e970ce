//! `QuadlineServer` builder and accept loop.
//!
//! Ties the layers together: WebSocket transport → protocol → gateway →
//! room registry, plus the periodic idle-room sweep.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use quadline_room::{RoomRegistry, SettlementBridge};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::directory::{GameCatalog, UserStore};
use crate::gateway::handle_connection;
use crate::QuadlineError;

/// Shared server state passed to each gateway task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The
/// registry sits behind a `Mutex`; it only holds room handles, so the
/// lock never covers game logic.
pub(crate) struct ServerState<C, U, S>
where
    C: GameCatalog,
    U: UserStore,
    S: SettlementBridge,
{
    pub(crate) rooms: Mutex<RoomRegistry<S>>,
    pub(crate) catalog: C,
    pub(crate) users: U,
    pub(crate) handshake_timeout: Duration,
}

/// Builder for configuring and starting a Quadline server.
///
/// # Example
///
/// ```rust,ignore
/// let server = QuadlineServer::builder()
///     .bind("0.0.0.0:8087")
///     .build(catalog, users, ledger)
///     .await?;
/// server.run().await
/// ```
pub struct QuadlineServerBuilder {
    bind_addr: String,
    idle_timeout: Duration,
    sweep_period: Duration,
    handshake_timeout: Duration,
}

impl QuadlineServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8087".to_string(),
            idle_timeout: Duration::from_secs(300),
            sweep_period: Duration::from_secs(30),
            handshake_timeout: Duration::from_secs(10),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// How long a pre-game room may sit idle before the sweep cancels it.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// How often the registry sweep runs.
    pub fn sweep_period(mut self, period: Duration) -> Self {
        self.sweep_period = period;
        self
    }

    /// How long a fresh socket may take to complete the hello phase.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Binds the listener and assembles the server.
    pub async fn build<C, U, S>(
        self,
        catalog: C,
        users: U,
        settlement: Arc<S>,
    ) -> Result<QuadlineServer<C, U, S>, QuadlineError>
    where
        C: GameCatalog,
        U: UserStore,
        S: SettlementBridge,
    {
        let listener = TcpListener::bind(&self.bind_addr).await?;
        tracing::info!(addr = %self.bind_addr, "listening");

        let state = Arc::new(ServerState {
            rooms: Mutex::new(RoomRegistry::new(settlement, self.idle_timeout)),
            catalog,
            users,
            handshake_timeout: self.handshake_timeout,
        });

        Ok(QuadlineServer {
            listener,
            sweep_period: self.sweep_period,
            state,
        })
    }
}

impl Default for QuadlineServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Quadline server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct QuadlineServer<C, U, S>
where
    C: GameCatalog,
    U: UserStore,
    S: SettlementBridge,
{
    listener: TcpListener,
    sweep_period: Duration,
    state: Arc<ServerState<C, U, S>>,
}

impl<C, U, S> QuadlineServer<C, U, S>
where
    C: GameCatalog,
    U: UserStore,
    S: SettlementBridge,
{
    /// Creates a new builder.
    pub fn builder() -> QuadlineServerBuilder {
        QuadlineServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the sweep timer and the accept loop until the process is
    /// terminated.
    pub async fn run(self) -> Result<(), QuadlineError> {
        tracing::info!("Quadline server running");

        let sweep_state = Arc::clone(&self.state);
        let mut ticker = tokio::time::interval(self.sweep_period);
        tokio::spawn(async move {
            // The first tick fires immediately; harmless on an empty
            // registry.
            loop {
                ticker.tick().await;
                sweep_state.rooms.lock().await.sweep().await;
            }
        });

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let ws = match tokio_tungstenite::accept_async(stream).await
                    {
                        Ok(ws) => ws,
                        Err(error) => {
                            tracing::debug!(
                                %addr,
                                %error,
                                "websocket handshake failed"
                            );
                            continue;
                        }
                    };
                    tracing::debug!(%addr, "accepted connection");

                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(error) = handle_connection(ws, state).await {
                            tracing::debug!(
                                %error,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(error) => {
                    tracing::error!(%error, "accept failed");
                }
            }
        }
    }
}
