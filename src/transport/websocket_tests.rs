use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tungstenite::Error as WsError;
use tungstenite::http::StatusCode;

use crate::config::HubSettings;
use crate::hub::{ClientSnapshot, Hub, HubHandle};
use crate::transport::serve;

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

const PATIENCE: Duration = Duration::from_secs(3);

async fn setup_server(settings: HubSettings) -> (SocketAddr, HubHandle) {
    let (hub, handle) = Hub::new(&settings);
    tokio::spawn(hub.run());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(serve(listener, handle.clone(), settings));

    (addr, handle)
}

async fn connect(addr: SocketAddr, user_id: &str) -> WsClient {
    let (ws_stream, _) = connect_async(format!("ws://{addr}/ws/{user_id}"))
        .await
        .expect("WebSocket handshake failed");
    ws_stream
}

/// Poll the hub's registry until `check` holds.
async fn wait_for(hub: &HubHandle, check: impl Fn(&[ClientSnapshot]) -> bool) {
    timeout(PATIENCE, async {
        loop {
            let clients = hub.clients().await.expect("hub stopped");
            if check(&clients) {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("hub never reached the expected state");
}

fn in_game(clients: &[ClientSnapshot], user_id: &str, game_id: &str) -> bool {
    clients
        .iter()
        .any(|c| c.user.user_id == user_id && c.user.current_game_id.as_deref() == Some(game_id))
}

async fn send(ws: &mut WsClient, value: Value) {
    ws.send(WsMessage::Text(value.to_string().into()))
        .await
        .expect("Failed to send");
}

/// Next data frame as JSON; control frames are skipped.
async fn recv(ws: &mut WsClient) -> Value {
    loop {
        let frame = timeout(PATIENCE, ws.next())
            .await
            .expect("Did not receive a frame")
            .expect("Connection ended")
            .expect("Read failed");
        match frame {
            WsMessage::Text(_) | WsMessage::Binary(_) => {
                let raw = frame.into_data();
                return serde_json::from_slice(&raw)
                    .unwrap_or_else(|e| panic!("Failed to parse frame {raw:?}: {e}"));
            }
            WsMessage::Close(frame) => panic!("Connection closed: {frame:?}"),
            _ => {}
        }
    }
}

/// Wait until the server closes the connection.
async fn expect_closed(ws: &mut WsClient) {
    timeout(PATIENCE, async {
        loop {
            match ws.next().await {
                None | Some(Err(_)) | Some(Ok(WsMessage::Close(_))) => return,
                Some(Ok(_)) => {}
            }
        }
    })
    .await
    .expect("connection was not closed");
}

#[tokio::test]
async fn test_two_players_join_move_and_leave() {
    let (addr, hub) = setup_server(HubSettings::default()).await;

    let mut alice = connect(addr, "A").await;
    wait_for(&hub, |c| c.len() == 1).await;
    send(&mut alice, json!({ "payload_type": "game:join", "payload": { "game_id": "g1" } })).await;
    wait_for(&hub, |c| in_game(c, "A", "g1")).await;

    let mut bob = connect(addr, "B").await;
    assert_eq!(
        recv(&mut alice).await,
        json!({ "payload_type": "connect", "payload": { "user_id": "B" } })
    );

    send(&mut bob, json!({ "payload_type": "game:join", "payload": { "game_id": "g1" } })).await;
    assert_eq!(
        recv(&mut alice).await,
        json!({ "payload_type": "game:join", "payload": { "user_id": "B", "game_id": "g1" } })
    );

    send(&mut alice, json!({ "payload_type": "game:move", "payload": { "direction": "UP" } })).await;
    assert_eq!(
        recv(&mut bob).await,
        json!({
            "payload_type": "game:move",
            "payload": { "user_id": "A", "game_id": "g1", "direction": "UP" }
        })
    );

    alice.close(None).await.expect("Failed to close");
    assert_eq!(
        recv(&mut bob).await,
        json!({ "payload_type": "disconnect", "payload": { "user_id": "A" } })
    );

    let clients = hub.clients().await.unwrap();
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].user.user_id, "B");
}

#[tokio::test]
async fn test_unknown_path_is_refused() {
    let (addr, hub) = setup_server(HubSettings::default()).await;

    for path in ["/", "/ws/", "/chat/A", "/ws/A/extra"] {
        match connect_async(format!("ws://{addr}{path}")).await {
            Err(WsError::Http(response)) => assert_eq!(response.status(), StatusCode::NOT_FOUND),
            Err(other) => panic!("Unexpected error for {path}: {other}"),
            Ok(_) => panic!("Handshake for {path} should have been refused"),
        }
    }

    assert!(hub.clients().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_event_keeps_connection_open() {
    let (addr, hub) = setup_server(HubSettings::default()).await;

    let mut watcher = connect(addr, "W").await;
    wait_for(&hub, |c| c.len() == 1).await;
    send(&mut watcher, json!({ "payload_type": "game:join", "payload": { "game_id": "g1" } })).await;
    wait_for(&hub, |c| in_game(c, "W", "g1")).await;

    let mut player = connect(addr, "P").await;
    assert_eq!(recv(&mut watcher).await["payload_type"], "connect");

    // no game yet, so the move is dropped without closing the connection
    send(&mut player, json!({ "payload_type": "game:move", "payload": { "direction": "UP" } })).await;
    send(&mut player, json!({ "payload_type": "game:join", "payload": { "game_id": "g1" } })).await;

    assert_eq!(
        recv(&mut watcher).await,
        json!({ "payload_type": "game:join", "payload": { "user_id": "P", "game_id": "g1" } })
    );
}

#[tokio::test]
async fn test_malformed_frame_closes_connection() {
    let (addr, hub) = setup_server(HubSettings::default()).await;

    let mut ws = connect(addr, "A").await;
    wait_for(&hub, |c| c.len() == 1).await;

    ws.send(WsMessage::Text("{not json".into()))
        .await
        .expect("Failed to send");

    expect_closed(&mut ws).await;
    wait_for(&hub, |c| c.is_empty()).await;
}

#[tokio::test]
async fn test_oversized_frame_closes_connection() {
    let settings = HubSettings {
        max_message_size: 64,
        ..HubSettings::default()
    };
    let (addr, hub) = setup_server(settings).await;

    let mut ws = connect(addr, "A").await;
    wait_for(&hub, |c| c.len() == 1).await;

    let game_id = "g".repeat(128);
    let _ = ws
        .send(WsMessage::Text(
            json!({ "payload_type": "game:join", "payload": { "game_id": game_id } })
                .to_string()
                .into(),
        ))
        .await;

    expect_closed(&mut ws).await;
    wait_for(&hub, |c| c.is_empty()).await;
}

#[tokio::test]
async fn test_connection_limit_refuses_extra_clients() {
    let settings = HubSettings {
        max_connections: 1,
        ..HubSettings::default()
    };
    let (addr, hub) = setup_server(settings).await;

    let mut first = connect(addr, "A").await;
    wait_for(&hub, |c| c.len() == 1).await;

    let mut second = connect(addr, "B").await;
    expect_closed(&mut second).await;

    let clients = hub.clients().await.unwrap();
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].user.user_id, "A");

    // the refused client was never announced
    send(&mut first, json!({ "payload_type": "game:join", "payload": { "game_id": "g1" } })).await;
    wait_for(&hub, |c| in_game(c, "A", "g1")).await;
    assert!(timeout(Duration::from_millis(100), first.next()).await.is_err());
}
