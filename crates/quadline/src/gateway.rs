//! Per-connection gateway: hello negotiation, room binding, and frame
//! routing.
//!
//! Each accepted socket gets its own Tokio task running this gateway.
//! The flow is:
//!   1. Hello phase: JSON `ClientHello` messages — `Create` replies
//!      with the new room id, `Connect` binds the socket to a room.
//!   2. Game phase: bare text frames (`ready`, `not_ready`,
//!      `<row>,<col>`) routed to the room; room events stream back as
//!      JSON `ServerMessage`s.
//!
//! Rejections go only to this socket; broadcasts come from the room.

use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use quadline_protocol::{
    ClientFrame, ClientHello, PlayerId, ProtocolError, ServerMessage,
};
use quadline_room::{RoomError, RoomEvent, RoomHandle, SettlementBridge};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::directory::{GameCatalog, UserStore};
use crate::server::ServerState;
use crate::QuadlineError;

type WsStream = WebSocketStream<TcpStream>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Drop guard that reports the player's disconnect to the room when
/// the gateway exits. Cleanup happens even if the gateway panics.
/// `Drop` is synchronous, so the async call runs in a spawned task.
struct DisconnectGuard {
    identity: PlayerId,
    handle: RoomHandle,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let identity = self.identity;
        let handle = self.handle.clone();
        tokio::spawn(async move {
            handle.disconnect(identity).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C, U, S>(
    ws: WsStream,
    state: Arc<ServerState<C, U, S>>,
) -> Result<(), QuadlineError>
where
    C: GameCatalog,
    U: UserStore,
    S: SettlementBridge,
{
    let (sink, mut source) = ws.split();

    // Everything outbound funnels through one writer task, so room
    // broadcasts and direct replies never interleave mid-frame.
    let (out_tx, out_rx) = mpsc::unbounded_channel::<ServerMessage>();
    tokio::spawn(write_outbound(sink, out_rx));

    // --- Hello phase ---
    let Some((handle, identity, events)) =
        negotiate(&mut source, &state, &out_tx).await?
    else {
        return Ok(());
    };

    tracing::info!(room_id = %handle.room_id(), %identity, "player connected");

    // Forward room events to the writer for the life of the binding.
    let forward_tx = out_tx.clone();
    tokio::spawn(async move {
        let mut events = events;
        while let Some(event) = events.recv().await {
            if forward_tx.send(event_message(event)).is_err() {
                break;
            }
        }
    });

    let _guard = DisconnectGuard {
        identity,
        handle: handle.clone(),
    };

    // --- Game phase ---
    while let Some(text) = next_text(&mut source).await? {
        let frame = match text.parse::<ClientFrame>() {
            Ok(frame) => frame,
            Err(error) => {
                tracing::debug!(%identity, %error, "unparseable frame");
                send(&out_tx, 400, error.to_string());
                continue;
            }
        };

        let result = match frame {
            ClientFrame::Ready => handle.set_ready(identity, true).await,
            ClientFrame::NotReady => handle.set_ready(identity, false).await,
            ClientFrame::Move { row, col } => {
                handle.play(identity, row, col).await
            }
        };

        match result {
            Ok(()) => {}
            Err(RoomError::Unavailable(_)) => break,
            Err(error) => {
                send(&out_tx, error_code(&error), error.to_string());
            }
        }
    }

    tracing::info!(room_id = %handle.room_id(), %identity, "socket closed");
    // _guard drops here → room disconnect fires.
    Ok(())
}

/// Runs the hello phase: zero or more `Create` requests, then one
/// `Connect` that binds the socket to a room. Returns `None` when the
/// client goes away (or is rejected) before binding.
async fn negotiate<C, U, S>(
    source: &mut WsSource,
    state: &Arc<ServerState<C, U, S>>,
    out_tx: &mpsc::UnboundedSender<ServerMessage>,
) -> Result<
    Option<(RoomHandle, PlayerId, mpsc::UnboundedReceiver<RoomEvent>)>,
    QuadlineError,
>
where
    C: GameCatalog,
    U: UserStore,
    S: SettlementBridge,
{
    loop {
        let text = match tokio::time::timeout(
            state.handshake_timeout,
            next_text(source),
        )
        .await
        {
            Ok(Ok(Some(text))) => text,
            Ok(Ok(None)) => return Ok(None),
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                tracing::debug!("hello timed out");
                send(out_tx, 408, "hello timed out".to_string());
                return Ok(None);
            }
        };

        let hello: ClientHello = match serde_json::from_str(&text) {
            Ok(hello) => hello,
            Err(error) => {
                tracing::debug!(%error, "malformed hello");
                send(out_tx, 400, ProtocolError::BadHello(error).to_string());
                continue;
            }
        };

        match hello {
            ClientHello::Create {
                game_id,
                bet,
                count_players,
            } => {
                let game = match state.catalog.game_by_id(game_id).await {
                    Ok(game) => game,
                    Err(error) => {
                        send(out_tx, 404, error.to_string());
                        continue;
                    }
                };

                // Lock only for the creation, drop before network I/O.
                let created = {
                    let mut rooms = state.rooms.lock().await;
                    rooms.create(&game, bet, count_players)
                };
                match created {
                    Ok(room_id) => {
                        let _ = out_tx.send(ServerMessage::Created { room_id });
                    }
                    Err(error) => {
                        send(out_tx, error_code(&error), error.to_string());
                    }
                }
            }

            ClientHello::Connect { room_id, identity } => {
                let profile = match state.users.profile(identity).await {
                    Ok(profile) => profile,
                    Err(error) => {
                        send(out_tx, 401, error.to_string());
                        return Ok(None);
                    }
                };

                let handle = match state.rooms.lock().await.lookup(&room_id) {
                    Ok(handle) => handle,
                    Err(error) => {
                        send(out_tx, error_code(&error), error.to_string());
                        return Ok(None);
                    }
                };

                let (event_tx, event_rx) = mpsc::unbounded_channel();
                if let Err(error) =
                    handle.join(identity, profile.display, event_tx).await
                {
                    send(out_tx, error_code(&error), error.to_string());
                    return Ok(None);
                }

                return Ok(Some((handle, identity, event_rx)));
            }
        }
    }
}

/// Serializes outbound messages onto the socket until the channel or
/// the socket goes away.
async fn write_outbound(
    mut sink: WsSink,
    mut out_rx: mpsc::UnboundedReceiver<ServerMessage>,
) {
    while let Some(message) = out_rx.recv().await {
        let text = match serde_json::to_string(&message) {
            Ok(text) => text,
            Err(error) => {
                tracing::error!(%error, "failed to encode server message");
                continue;
            }
        };
        if sink.send(Message::Text(text.into())).await.is_err() {
            break;
        }
    }
    let _ = sink.close().await;
}

/// Reads the next text frame, skipping control frames. `None` means
/// the peer closed the socket.
async fn next_text(source: &mut WsSource) -> Result<Option<String>, QuadlineError> {
    while let Some(message) = source.next().await {
        match message? {
            Message::Text(text) => return Ok(Some(text.to_string())),
            Message::Close(_) => return Ok(None),
            // skip ping/pong/binary
            _ => continue,
        }
    }
    Ok(None)
}

fn send(out_tx: &mpsc::UnboundedSender<ServerMessage>, code: u16, message: String) {
    let _ = out_tx.send(ServerMessage::Error { code, message });
}

/// Converts a room event into its wire form.
fn event_message(event: RoomEvent) -> ServerMessage {
    match event {
        RoomEvent::Snapshot(snapshot) => ServerMessage::Snapshot(snapshot),
        RoomEvent::Cancelled { reason } => ServerMessage::Cancelled { reason },
    }
}

/// Maps a room rejection to an HTTP-convention status code.
fn error_code(error: &RoomError) -> u16 {
    match error {
        RoomError::NotFound(_) => 404,
        RoomError::Full(_) | RoomError::NotJoinable(_) => 409,
        RoomError::NotMember(..) => 403,
        RoomError::NotStarted(_)
        | RoomError::AlreadyStarted(_)
        | RoomError::NotYourTurn(_) => 409,
        RoomError::InvalidCell(_)
        | RoomError::InvalidBet
        | RoomError::InvalidPlayerCount { .. } => 400,
        RoomError::Finished(_) => 410,
        RoomError::Unavailable(_) => 503,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadline_protocol::RoomId;
    use quadline_room::BoardError;

    #[test]
    fn test_error_codes_follow_http_conventions() {
        let room = RoomId::new("g1-00");
        assert_eq!(error_code(&RoomError::NotFound(room.clone())), 404);
        assert_eq!(error_code(&RoomError::Full(room.clone())), 409);
        assert_eq!(error_code(&RoomError::NotYourTurn(PlayerId(1))), 409);
        assert_eq!(
            error_code(&RoomError::InvalidCell(BoardError::OutOfBounds {
                row: 5,
                col: 0,
            })),
            400
        );
        assert_eq!(error_code(&RoomError::Finished(room.clone())), 410);
        assert_eq!(error_code(&RoomError::Unavailable(room)), 503);
    }

    #[test]
    fn test_cancelled_event_becomes_cancelled_message() {
        let message = event_message(RoomEvent::Cancelled {
            reason: "timed out".into(),
        });
        assert_eq!(
            message,
            ServerMessage::Cancelled {
                reason: "timed out".into()
            }
        );
    }
}
