//! Client representation
//!
//! `Client` holds the sending side of a bounded per-connection mailbox. The
//! writer pump is the only consumer of the matching [`Mailbox`]. Dropping
//! the `Client` closes the mailbox and resolves the [`Hangup`] receiver,
//! which is how the hub tears a connection down.

use std::fmt;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::hub::event::Event;

/// Receiving side of a client's outbound queue.
pub type Mailbox = mpsc::Receiver<Event>;

/// Resolves once the hub has dropped the client.
pub type Hangup = oneshot::Receiver<()>;

/// Registry identity of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identity plus current room membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: String,
    /// Set by the most recent validated join; a user is in at most one game.
    pub current_game_id: Option<String>,
}

impl User {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            current_game_id: None,
        }
    }
}

#[derive(Debug)]
pub struct Client {
    pub id: ClientId,
    pub user: User,
    mailbox: mpsc::Sender<Event>,
    _hangup: oneshot::Sender<()>,
}

impl Client {
    /// Create a client for `user_id` with a mailbox of `mailbox_capacity`
    /// slots (at least one). Returns the mailbox receiver for the writer
    /// pump and the hangup receiver for the reader pump.
    pub fn new(user_id: impl Into<String>, mailbox_capacity: usize) -> (Self, Mailbox, Hangup) {
        let (mailbox, mailbox_rx) = mpsc::channel(mailbox_capacity.max(1));
        let (hangup_tx, hangup_rx) = oneshot::channel();

        let client = Self {
            id: ClientId::new(),
            user: User::new(user_id),
            mailbox,
            _hangup: hangup_tx,
        };

        (client, mailbox_rx, hangup_rx)
    }

    /// Place `event` at the tail of the mailbox without waiting.
    pub fn deliver(&self, event: Event) -> Result<(), TrySendError<Event>> {
        self.mailbox.try_send(event)
    }
}
