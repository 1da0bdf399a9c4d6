//! WebSocket transport
//!
//! This file implements the thin adapter in front of the hub:
//! - accept TCP connections and perform the WebSocket handshake
//! - take the user id from the request path `/ws/{user_id}`; any other path
//!   is refused with 404 before the upgrade completes
//! - build a `Client`, enqueue its registration with the hub and spawn its
//!   reader and writer pumps
//!
//! No authentication is performed here; the path segment is trusted as the
//! user's identity.

use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{WebSocketStream, accept_hdr_async_with_config};
use tracing::{debug, info, warn};
use tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tungstenite::http::StatusCode;
use tungstenite::protocol::WebSocketConfig;

use crate::client::{Client, ClientId};
use crate::config::{HubSettings, Settings};
use crate::hub::HubHandle;
use crate::transport::pump::{Keepalive, read_pump, write_pump};
use crate::utils::HubError;

const WS_PATH_PREFIX: &str = "/ws/";

/// Bind `settings.server` and serve connections until the listener fails.
pub async fn start_websocket_server(hub: HubHandle, settings: Settings) -> std::io::Result<()> {
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;

    info!("WebSocket server listening on ws://{addr}{WS_PATH_PREFIX}{{user_id}}");

    serve(listener, hub, settings.hub).await
}

/// Accept loop over an already bound listener.
pub async fn serve(listener: TcpListener, hub: HubHandle, settings: HubSettings) -> std::io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let hub = hub.clone();
        let settings = settings.clone();

        tokio::spawn(async move {
            debug!(%peer, "Accepted connection");
            handle_connection(stream, hub, settings).await;
        });
    }
}

async fn handle_connection(stream: TcpStream, hub: HubHandle, settings: HubSettings) {
    let mut user_id = None;

    let callback = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        match user_id_from_path(request.uri().path()) {
            Some(id) => {
                user_id = Some(id.to_string());
                Ok(response)
            }
            None => {
                let mut refusal = ErrorResponse::new(Some(format!(
                    "expected {WS_PATH_PREFIX}{{user_id}}"
                )));
                *refusal.status_mut() = StatusCode::NOT_FOUND;
                Err(refusal)
            }
        }
    };

    let ws_stream =
        match accept_hdr_async_with_config(stream, callback, Some(websocket_config(&settings)))
            .await
        {
            Ok(ws) => ws,
            Err(e) => {
                warn!("WebSocket handshake error: {e}");
                return;
            }
        };

    let Some(user_id) = user_id else {
        return;
    };

    if let Err(e) = register_connection(&hub, ws_stream, user_id, &settings) {
        warn!("Failed to register connection: {e}");
    }
}

/// Hand an established connection to the hub.
///
/// The create request is queued before the pumps start, so every frame the
/// reader forwards is processed after the client is registered.
pub fn register_connection<S>(
    hub: &HubHandle,
    ws_stream: WebSocketStream<S>,
    user_id: String,
    settings: &HubSettings,
) -> Result<ClientId, HubError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (client, mailbox, hangup) = Client::new(user_id, settings.mailbox_capacity);
    let client_id = client.id;
    info!(%client_id, user_id = %client.user.user_id, "Connection established");

    hub.create(client)?;

    let keepalive = Keepalive::from(settings);
    let (sink, stream) = ws_stream.split();

    tokio::spawn(write_pump(sink, mailbox, client_id, keepalive));
    tokio::spawn(read_pump(stream, client_id, hub.clone(), hangup, keepalive));

    Ok(client_id)
}

/// Handshake configuration; `max_message_size` caps both frames and
/// reassembled messages.
pub fn websocket_config(settings: &HubSettings) -> WebSocketConfig {
    WebSocketConfig::default()
        .max_message_size(Some(settings.max_message_size))
        .max_frame_size(Some(settings.max_message_size))
}

/// The user id segment of `/ws/{user_id}`.
pub fn user_id_from_path(path: &str) -> Option<&str> {
    let user_id = path.strip_prefix(WS_PATH_PREFIX)?;
    if user_id.is_empty() || user_id.contains('/') {
        return None;
    }
    Some(user_id)
}
