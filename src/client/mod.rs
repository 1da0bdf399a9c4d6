//! The `client` module defines the per-connection record of the hub.
//!
//! A [`Client`] owns the sending side of one connection's mailbox, the
//! hangup signal that stops its reader pump, and exactly one [`User`]. The
//! registry keys clients by [`ClientId`], never by user id, so one user may
//! hold several connections at once.
//!
//! The `keypad` helpers translate phone keypad digits into move directions
//! for the demo client.

pub mod keypad;
pub mod socket_client;

pub use socket_client::{Client, ClientId, Hangup, Mailbox, User};
