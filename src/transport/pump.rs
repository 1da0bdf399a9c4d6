//! Per-connection pumps
//!
//! Every connection runs two tasks:
//! - the writer pump is the only consumer of the client's mailbox; it also
//!   sends keepalive pings
//! - the reader pump decodes inbound frames and hands them to the hub
//!
//! Both are generic over the message `Sink` / `Stream` so they can run on a
//! split `WebSocketStream` or on in-memory channels.

use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::time::{Instant, interval_at, timeout, timeout_at};
use tracing::{debug, warn};
use tungstenite::Error as WsError;
use tungstenite::error::ProtocolError;
use tungstenite::protocol::frame::coding::CloseCode;
use tungstenite::protocol::{CloseFrame, Message};

use crate::client::{ClientId, Hangup, Mailbox};
use crate::config::HubSettings;
use crate::hub::HubHandle;
use crate::hub::event::{Envelope, Event};
use crate::utils::HubError;

/// Keepalive timings shared by both pumps.
#[derive(Debug, Clone, Copy)]
pub struct Keepalive {
    pub ping_period: Duration,
    /// Read deadline; extended each time a pong arrives.
    pub pong_wait: Duration,
    pub write_wait: Duration,
}

impl From<&HubSettings> for Keepalive {
    fn from(settings: &HubSettings) -> Self {
        Self {
            ping_period: settings.ping_period(),
            pong_wait: settings.pong_wait(),
            write_wait: settings.write_wait(),
        }
    }
}

/// Drain `mailbox` onto `sink` until the mailbox closes or a write fails.
/// The sink is always closed on return.
pub async fn write_pump<K>(mut sink: K, mut mailbox: Mailbox, client_id: ClientId, keepalive: Keepalive)
where
    K: Sink<Message, Error = WsError> + Unpin,
{
    let mut ticker = interval_at(
        Instant::now() + keepalive.ping_period,
        keepalive.ping_period,
    );

    loop {
        tokio::select! {
            event = mailbox.recv() => {
                let Some(event) = event else {
                    debug!(%client_id, "Mailbox closed");
                    let _ = timeout(keepalive.write_wait, sink.send(Message::Close(None))).await;
                    break;
                };

                match write_batch(&mut sink, &mut mailbox, event, keepalive.write_wait).await {
                    Ok(()) => {}
                    Err(err @ HubError::Encode(_)) => {
                        warn!(%client_id, "{err}");
                        let _ = timeout(keepalive.write_wait, sink.send(Message::Close(None))).await;
                        break;
                    }
                    Err(err) => {
                        debug!(%client_id, "Write failed: {err}");
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                let ping = timeout(keepalive.write_wait, sink.send(Message::Ping(Default::default())));
                match ping.await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        debug!(%client_id, "Ping failed: {err}");
                        break;
                    }
                    Err(_) => {
                        debug!(%client_id, "Ping write deadline exceeded");
                        break;
                    }
                }
            }
        }
    }

    // a peer that stopped reading must not keep the socket alive
    let _ = timeout(keepalive.write_wait, sink.close()).await;
    debug!(%client_id, "Write pump stopped");
}

/// Send `first`, then whatever was already queued behind it, one frame per
/// event, under a single write deadline.
async fn write_batch<K>(
    sink: &mut K,
    mailbox: &mut Mailbox,
    first: Event,
    write_wait: Duration,
) -> Result<(), HubError>
where
    K: Sink<Message, Error = WsError> + Unpin,
{
    // only what is queued now; events arriving mid-batch wait for the next wake
    let backlog = mailbox.len();

    let batch = async {
        sink.feed(Message::Text(first.encode()?.into())).await?;

        for _ in 0..backlog {
            let Ok(event) = mailbox.try_recv() else {
                break;
            };
            sink.feed(Message::Text(event.encode()?.into())).await?;
        }

        sink.flush().await?;
        Ok::<(), HubError>(())
    };

    match timeout(write_wait, batch).await {
        Ok(result) => result,
        Err(_) => Err(HubError::Timeout("write")),
    }
}

/// Read frames until the connection ends, the envelope is malformed, the
/// read deadline passes or the hub hangs up on this client. Requests
/// `destroy` from the hub on the way out.
pub async fn read_pump<St>(
    mut stream: St,
    client_id: ClientId,
    hub: HubHandle,
    mut hangup: Hangup,
    keepalive: Keepalive,
) where
    St: Stream<Item = Result<Message, WsError>> + Unpin,
{
    let mut deadline = Instant::now() + keepalive.pong_wait;

    loop {
        let next = tokio::select! {
            _ = &mut hangup => {
                debug!(%client_id, "Hub hung up");
                break;
            }
            next = timeout_at(deadline, stream.next()) => next,
        };

        let message = match next {
            Err(_) => {
                warn!(%client_id, "Read deadline exceeded, no pong received");
                break;
            }
            Ok(None) => {
                debug!(%client_id, "Connection ended");
                break;
            }
            Ok(Some(Err(err))) => {
                if is_expected_close(&err) {
                    debug!(%client_id, "Connection closed: {err}");
                } else {
                    warn!(%client_id, "Read failed: {err}");
                }
                break;
            }
            Ok(Some(Ok(message))) => message,
        };

        match message {
            Message::Pong(_) => {
                deadline = Instant::now() + keepalive.pong_wait;
            }
            Message::Close(frame) => {
                if is_expected_close_frame(frame.as_ref()) {
                    debug!(%client_id, "Peer closed the connection");
                } else {
                    warn!(%client_id, ?frame, "Peer closed the connection unexpectedly");
                }
                break;
            }
            Message::Text(_) | Message::Binary(_) => {
                let envelope = match Envelope::decode(&message.into_data()) {
                    Ok(envelope) => envelope,
                    Err(err) => {
                        warn!(%client_id, "{err}");
                        break;
                    }
                };

                if let Err(err) = dispatch(&hub, client_id, envelope).await {
                    if err.is_terminal() {
                        warn!(%client_id, "{err}");
                        break;
                    }
                    warn!(%client_id, "Dropped message: {err}");
                }
            }
            // pings are answered by the protocol layer
            _ => {}
        }
    }

    if hub.destroy(client_id).is_err() {
        debug!(%client_id, "Hub already stopped");
    }
    debug!(%client_id, "Read pump stopped");
}

async fn dispatch(hub: &HubHandle, client_id: ClientId, envelope: Envelope) -> Result<(), HubError> {
    let event = Event::try_from(envelope)?;
    debug!(%client_id, payload_type = event.kind(), "Received event");
    hub.dispatch(client_id, event).await
}

/// Going-away and abnormal-closure errors are the normal ways a peer leaves.
fn is_expected_close(err: &WsError) -> bool {
    match err {
        WsError::ConnectionClosed
        | WsError::AlreadyClosed
        | WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => true,
        WsError::Io(io) => matches!(
            io.kind(),
            std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::UnexpectedEof
        ),
        _ => false,
    }
}

/// Only going-away is expected; abnormal closure never arrives as a frame.
pub(crate) fn is_expected_close_frame(frame: Option<&CloseFrame>) -> bool {
    match frame {
        None => true,
        Some(frame) => frame.code == CloseCode::Away,
    }
}
