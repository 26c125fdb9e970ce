//! End-to-end tests against a live server: real sockets, real rooms,
//! real settlement through the in-memory ledger.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use quadline::{MemoryCatalog, MemoryUsers, QuadlineServer};
use quadline_protocol::{GameDefinition, GameId, PlayerId, UserProfile};
use quadline_room::MemoryLedger;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Boots a server on an ephemeral port with game 1 in the catalog and
/// four funded players.
async fn start_server(ledger: Arc<MemoryLedger>) -> SocketAddr {
    let mut catalog = MemoryCatalog::new();
    catalog.insert(GameDefinition {
        id: GameId(1),
        title: "Quadline".into(),
        description: "Four in a row on a 4x4 board".into(),
        stake_unit: "credits".into(),
        max_players: 4,
        endpoint: "ws://localhost:8087/ws".into(),
    });

    let mut users = MemoryUsers::new();
    for id in 1..=4 {
        users.insert(UserProfile {
            identity: PlayerId(id),
            display: format!("player-{id}"),
        });
        ledger.deposit(PlayerId(id), 1000);
    }

    let server = QuadlineServer::<MemoryCatalog, MemoryUsers, MemoryLedger>::builder()
        .bind("127.0.0.1:0")
        .idle_timeout(Duration::from_secs(60))
        .build(catalog, users, ledger)
        .await
        .expect("failed to bind test server");
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

async fn connect(addr: SocketAddr) -> WsClient {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("failed to connect");
    ws
}

async fn send_text(ws: &mut WsClient, text: impl Into<String>) {
    ws.send(Message::Text(text.into().into())).await.unwrap();
}

async fn send_json(ws: &mut WsClient, value: Value) {
    send_text(ws, value.to_string()).await;
}

/// Receives the next JSON message, skipping control frames.
async fn recv_json(ws: &mut WsClient) -> Value {
    loop {
        match ws.next().await.expect("stream ended").expect("recv failed") {
            Message::Text(text) => {
                return serde_json::from_str(&text).expect("non-JSON message");
            }
            _ => continue,
        }
    }
}

/// Drains messages until one satisfies the predicate.
async fn wait_for(ws: &mut WsClient, pred: impl Fn(&Value) -> bool) -> Value {
    loop {
        let msg = recv_json(ws).await;
        if pred(&msg) {
            return msg;
        }
    }
}

/// Creates a two-player room over `ws` and returns its id.
async fn create_room(ws: &mut WsClient, bet: u64) -> String {
    send_json(
        ws,
        json!({"type": "Create", "game_id": 1, "bet": bet, "count_players": 2}),
    )
    .await;
    let created = wait_for(ws, |m| m["type"] == "Created").await;
    created["room_id"].as_str().unwrap().to_string()
}

async fn connect_to_room(ws: &mut WsClient, room_id: &str, identity: u64) {
    send_json(
        ws,
        json!({"type": "Connect", "room_id": room_id, "identity": identity}),
    )
    .await;
}

/// Readies both sockets and drains each to the game-start snapshot, so
/// later waits never match a stale backlog message. Returns the
/// opener's identity.
async fn ready_up(ws1: &mut WsClient, ws2: &mut WsClient) -> u64 {
    send_text(ws1, "ready").await;
    send_text(ws2, "ready").await;
    let started = wait_for(ws1, |m| {
        m["type"] == "Snapshot" && m["phase"] == "in_progress"
    })
    .await;
    wait_for(ws2, |m| m["type"] == "Snapshot" && m["phase"] == "in_progress")
        .await;
    started["current_turn"].as_u64().unwrap()
}

#[tokio::test]
async fn test_create_connect_and_play_to_a_settled_win() {
    let ledger = Arc::new(MemoryLedger::new());
    let addr = start_server(Arc::clone(&ledger)).await;

    let mut ws1 = connect(addr).await;
    let room_id = create_room(&mut ws1, 100).await;
    connect_to_room(&mut ws1, &room_id, 1).await;
    let snap = wait_for(&mut ws1, |m| m["type"] == "Snapshot").await;
    assert_eq!(snap["phase"], "forming");
    assert_eq!(snap["roster"][0]["display"], "player-1");

    let mut ws2 = connect(addr).await;
    connect_to_room(&mut ws2, &room_id, 2).await;
    wait_for(&mut ws1, |m| m["phase"] == "ready_check").await;

    let opener = ready_up(&mut ws1, &mut ws2).await;
    let second = if opener == 1 { 2 } else { 1 };

    // The opener claims row 0, the other row 1; the opener's fourth
    // move completes the line.
    for col in 0..4u64 {
        let (mover_ws, other_ws) = if opener == 1 {
            (&mut ws1, &mut ws2)
        } else {
            (&mut ws2, &mut ws1)
        };
        send_text(mover_ws, format!("0,{col}")).await;
        if col < 3 {
            wait_for(other_ws, |m| m["current_turn"] == second).await;
            send_text(other_ws, format!("1,{col}")).await;
            wait_for(mover_ws, |m| m["current_turn"] == opener).await;
        }
    }

    let finished =
        wait_for(&mut ws1, |m| m["phase"] == "finished").await;
    assert_eq!(finished["winner"], opener);
    assert!(finished["current_turn"].is_null());
    assert_eq!(finished["board"][0][3], opener);

    // The closed snapshot arrives after settlement.
    wait_for(&mut ws1, |m| m["phase"] == "closed").await;
    assert_eq!(ledger.balance(PlayerId(opener)), 1100);
    assert_eq!(ledger.balance(PlayerId(second)), 900);
}

#[tokio::test]
async fn test_create_rejections() {
    let ledger = Arc::new(MemoryLedger::new());
    let addr = start_server(ledger).await;
    let mut ws = connect(addr).await;

    send_json(
        &mut ws,
        json!({"type": "Create", "game_id": 1, "bet": 0, "count_players": 2}),
    )
    .await;
    let err = wait_for(&mut ws, |m| m["type"] == "Error").await;
    assert_eq!(err["code"], 400);

    send_json(
        &mut ws,
        json!({"type": "Create", "game_id": 1, "bet": 100, "count_players": 5}),
    )
    .await;
    let err = wait_for(&mut ws, |m| m["type"] == "Error").await;
    assert_eq!(err["code"], 400);

    send_json(
        &mut ws,
        json!({"type": "Create", "game_id": 9, "bet": 100, "count_players": 2}),
    )
    .await;
    let err = wait_for(&mut ws, |m| m["type"] == "Error").await;
    assert_eq!(err["code"], 404);
}

#[tokio::test]
async fn test_connect_rejections() {
    let ledger = Arc::new(MemoryLedger::new());
    let addr = start_server(ledger).await;

    // Unknown identity.
    let mut ws = connect(addr).await;
    connect_to_room(&mut ws, "g1-doesnotexist", 99).await;
    let err = wait_for(&mut ws, |m| m["type"] == "Error").await;
    assert_eq!(err["code"], 401);

    // Known identity, unknown room.
    let mut ws = connect(addr).await;
    connect_to_room(&mut ws, "g1-doesnotexist", 1).await;
    let err = wait_for(&mut ws, |m| m["type"] == "Error").await;
    assert_eq!(err["code"], 404);
}

#[tokio::test]
async fn test_bad_frames_are_rejected_without_breaking_the_connection() {
    let ledger = Arc::new(MemoryLedger::new());
    let addr = start_server(ledger).await;

    let mut ws = connect(addr).await;
    let room_id = create_room(&mut ws, 100).await;
    connect_to_room(&mut ws, &room_id, 1).await;
    wait_for(&mut ws, |m| m["type"] == "Snapshot").await;

    // Unparseable frame.
    send_text(&mut ws, "banana").await;
    let err = wait_for(&mut ws, |m| m["type"] == "Error").await;
    assert_eq!(err["code"], 400);

    // Well-formed move, but the game has not started.
    send_text(&mut ws, "0,0").await;
    let err = wait_for(&mut ws, |m| m["type"] == "Error").await;
    assert_eq!(err["code"], 409);

    // The connection still works.
    send_text(&mut ws, "ready").await;
    let snap = wait_for(&mut ws, |m| m["type"] == "Snapshot").await;
    assert_eq!(snap["roster"][0]["ready"], true);
}

#[tokio::test]
async fn test_out_of_bounds_move_is_rejected_in_game() {
    let ledger = Arc::new(MemoryLedger::new());
    let addr = start_server(ledger).await;

    let mut ws1 = connect(addr).await;
    let room_id = create_room(&mut ws1, 100).await;
    connect_to_room(&mut ws1, &room_id, 1).await;
    let mut ws2 = connect(addr).await;
    connect_to_room(&mut ws2, &room_id, 2).await;
    wait_for(&mut ws1, |m| m["phase"] == "ready_check").await;

    let opener = ready_up(&mut ws1, &mut ws2).await;
    let mover = if opener == 1 { &mut ws1 } else { &mut ws2 };

    send_text(mover, "5,0").await;
    let err = wait_for(mover, |m| m["type"] == "Error").await;
    assert_eq!(err["code"], 400);
}

#[tokio::test]
async fn test_dropping_the_socket_forfeits_the_game() {
    let ledger = Arc::new(MemoryLedger::new());
    let addr = start_server(Arc::clone(&ledger)).await;

    let mut ws1 = connect(addr).await;
    let room_id = create_room(&mut ws1, 100).await;
    connect_to_room(&mut ws1, &room_id, 1).await;
    let mut ws2 = connect(addr).await;
    connect_to_room(&mut ws2, &room_id, 2).await;
    wait_for(&mut ws1, |m| m["phase"] == "ready_check").await;

    ready_up(&mut ws1, &mut ws2).await;
    drop(ws2);

    let finished =
        wait_for(&mut ws1, |m| m["phase"] == "finished").await;
    assert_eq!(finished["winner"], 1);

    wait_for(&mut ws1, |m| m["phase"] == "closed").await;
    assert_eq!(ledger.balance(PlayerId(1)), 1100);
    assert_eq!(ledger.balance(PlayerId(2)), 900);
}
