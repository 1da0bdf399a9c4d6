//! Hub engine
//!
//! This module contains the client registry and the fan-out primitives:
//! - `create` / `destroy` change registry membership
//! - `emit_to_user`, `emit_to_game` and `broadcast_all` push an event into the
//!   mailboxes of a filtered set of registered clients
//!
//! Concurrency and usage notes:
//! - `Hub` is owned by a single task running [`Hub::run`]. Every registry
//!   access, read or write, happens on that task in command order, so a
//!   fan-out never observes a half-applied create or destroy. A client
//!   receives an event iff it was registered and matched the filter when the
//!   hub processed the command that produced it.
//! - Other tasks talk to the hub through a cloneable [`HubHandle`].
//! - Mailboxes are bounded. Delivery never waits: if a mailbox is full the
//!   event is dropped for that client and a warning is logged, so one stalled
//!   client cannot hold up fan-out to the others.

use std::collections::HashMap;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, trace, warn};

use crate::client::{Client, ClientId, User};
use crate::config::HubSettings;
use crate::hub::event::{Event, Presence};
use crate::hub::router;
use crate::utils::HubError;

/// A request processed by the hub task.
#[derive(Debug)]
pub enum Command {
    /// Register a client and announce it to everyone else.
    Create { client: Client },

    /// Remove a client, announce the disconnect and close its connection.
    Destroy { id: ClientId },

    /// Run the router for an event sent by `sender`.
    Dispatch {
        sender: ClientId,
        event: Event,
        res_tx: oneshot::Sender<Result<(), HubError>>,
    },

    EmitToUser {
        user_id: String,
        event: Event,
        res_tx: oneshot::Sender<usize>,
    },

    EmitToGame {
        game_id: String,
        sender: ClientId,
        event: Event,
        res_tx: oneshot::Sender<usize>,
    },

    BroadcastAll {
        sender: ClientId,
        event: Event,
        res_tx: oneshot::Sender<usize>,
    },

    /// Snapshot of the registry.
    Clients {
        res_tx: oneshot::Sender<Vec<ClientSnapshot>>,
    },
}

/// A registered client as seen by the hub at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSnapshot {
    pub id: ClientId,
    pub user: User,
}

#[derive(Debug)]
pub struct Hub {
    clients: HashMap<ClientId, Client>,
    max_connections: usize,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
}

impl Hub {
    pub fn new(settings: &HubSettings) -> (Self, HubHandle) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        (
            Self {
                clients: HashMap::new(),
                max_connections: settings.max_connections,
                cmd_rx,
            },
            HubHandle { cmd_tx },
        )
    }

    /// Process commands until every [`HubHandle`] has been dropped. Dropping
    /// the hub afterwards closes every remaining connection.
    pub async fn run(mut self) {
        info!("Hub started");

        while let Some(cmd) = self.cmd_rx.recv().await {
            self.process_command(cmd);
        }

        info!(clients = self.clients.len(), "Hub stopped");
    }

    fn process_command(&mut self, cmd: Command) {
        trace!(?cmd, "process_command");

        match cmd {
            Command::Create { client } => self.create(client),
            Command::Destroy { id } => self.destroy(&id),
            Command::Dispatch {
                sender,
                event,
                res_tx,
            } => {
                let _ = res_tx.send(router::route(self, &sender, event));
            }
            Command::EmitToUser {
                user_id,
                event,
                res_tx,
            } => {
                let _ = res_tx.send(self.emit_to_user(&user_id, &event));
            }
            Command::EmitToGame {
                game_id,
                sender,
                event,
                res_tx,
            } => {
                let _ = res_tx.send(self.emit_to_game(&game_id, &sender, &event));
            }
            Command::BroadcastAll {
                sender,
                event,
                res_tx,
            } => {
                let _ = res_tx.send(self.broadcast_all(&sender, &event));
            }
            Command::Clients { res_tx } => {
                let _ = res_tx.send(self.snapshot());
            }
        }
    }

    /// Register `client`, then route a `connect` event on its behalf.
    ///
    /// When the hub is at capacity the client is dropped instead, which
    /// closes its connection.
    pub fn create(&mut self, client: Client) {
        if self.clients.len() >= self.max_connections {
            warn!(
                client_id = %client.id,
                user_id = %client.user.user_id,
                max_connections = self.max_connections,
                "Connection limit reached, refusing client"
            );
            return;
        }

        let id = client.id;
        let event = Event::Connect(Presence::new(client.user.user_id.clone()));

        info!(client_id = %id, user_id = %client.user.user_id, "Client registered");
        self.clients.insert(id, client);

        if let Err(err) = router::route(self, &id, event) {
            error!(client_id = %id, "Failed to announce connect: {err}");
        }
    }

    /// Remove the client, route a `disconnect` event on its behalf and close
    /// its mailbox and connection. Destroying an unknown client is a no-op,
    /// so the disconnect is announced exactly once.
    pub fn destroy(&mut self, id: &ClientId) {
        let Some(client) = self.clients.remove(id) else {
            debug!(client_id = %id, "Destroy for unregistered client ignored");
            return;
        };

        let event = Event::Disconnect(Presence::new(client.user.user_id.clone()));
        if let Err(err) = router::route(self, id, event) {
            error!(client_id = %id, "Failed to announce disconnect: {err}");
        }

        info!(client_id = %id, user_id = %client.user.user_id, "Client destroyed");
        drop(client);
    }

    /// Deliver to every connection of `user_id`.
    pub fn emit_to_user(&self, user_id: &str, event: &Event) -> usize {
        self.fan_out(event, |client| client.user.user_id == user_id)
    }

    /// Deliver to every client in `game_id` except `sender`.
    pub fn emit_to_game(&self, game_id: &str, sender: &ClientId, event: &Event) -> usize {
        self.fan_out(event, |client| {
            client.id != *sender && client.user.current_game_id.as_deref() == Some(game_id)
        })
    }

    /// Deliver to every client except `sender`.
    pub fn broadcast_all(&self, sender: &ClientId, event: &Event) -> usize {
        self.fan_out(event, |client| client.id != *sender)
    }

    pub fn user(&self, id: &ClientId) -> Option<&User> {
        self.clients.get(id).map(|client| &client.user)
    }

    pub fn user_mut(&mut self, id: &ClientId) -> Option<&mut User> {
        self.clients.get_mut(id).map(|client| &mut client.user)
    }

    pub fn contains(&self, id: &ClientId) -> bool {
        self.clients.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn snapshot(&self) -> Vec<ClientSnapshot> {
        self.clients
            .values()
            .map(|client| ClientSnapshot {
                id: client.id,
                user: client.user.clone(),
            })
            .collect()
    }

    /// Returns how many mailboxes accepted the event.
    fn fan_out(&self, event: &Event, filter: impl Fn(&Client) -> bool) -> usize {
        let mut delivered = 0;

        for client in self.clients.values() {
            if !filter(client) {
                continue;
            }

            match client.deliver(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(
                        client_id = %client.id,
                        payload_type = event.kind(),
                        "Mailbox full, dropping event"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(client_id = %client.id, "Mailbox closed, skipping");
                }
            }
        }

        debug!(payload_type = event.kind(), delivered, "Fan-out complete");
        delivered
    }
}

/// Cloneable sender side of the hub's command queue.
#[derive(Debug, Clone)]
pub struct HubHandle {
    cmd_tx: mpsc::UnboundedSender<Command>,
}

impl HubHandle {
    fn send(&self, cmd: Command) -> Result<(), HubError> {
        self.cmd_tx.send(cmd).map_err(|_| HubError::HubClosed)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, HubError> {
        let (res_tx, res_rx) = oneshot::channel();
        self.send(make(res_tx))?;
        res_rx.await.map_err(|_| HubError::HubClosed)
    }

    /// Enqueue registration. Commands sent afterwards through any handle are
    /// processed after it.
    pub fn create(&self, client: Client) -> Result<(), HubError> {
        self.send(Command::Create { client })
    }

    pub fn destroy(&self, id: ClientId) -> Result<(), HubError> {
        self.send(Command::Destroy { id })
    }

    /// Route `event` on behalf of `sender` and wait for the router's verdict.
    pub async fn dispatch(&self, sender: ClientId, event: Event) -> Result<(), HubError> {
        self.request(|res_tx| Command::Dispatch {
            sender,
            event,
            res_tx,
        })
        .await?
    }

    pub async fn emit_to_user(
        &self,
        user_id: impl Into<String>,
        event: Event,
    ) -> Result<usize, HubError> {
        let user_id = user_id.into();
        self.request(|res_tx| Command::EmitToUser {
            user_id,
            event,
            res_tx,
        })
        .await
    }

    pub async fn emit_to_game(
        &self,
        game_id: impl Into<String>,
        sender: ClientId,
        event: Event,
    ) -> Result<usize, HubError> {
        let game_id = game_id.into();
        self.request(|res_tx| Command::EmitToGame {
            game_id,
            sender,
            event,
            res_tx,
        })
        .await
    }

    pub async fn broadcast_all(&self, sender: ClientId, event: Event) -> Result<usize, HubError> {
        self.request(|res_tx| Command::BroadcastAll {
            sender,
            event,
            res_tx,
        })
        .await
    }

    pub async fn clients(&self) -> Result<Vec<ClientSnapshot>, HubError> {
        self.request(|res_tx| Command::Clients { res_tx }).await
    }
}
