//! # GameHub
//!
//! `gamehub` is a real-time event hub for multiplayer games. Clients connect
//! over WebSockets at `/ws/{user_id}`, join a game and stream moves; the hub
//! relays each event to the other clients that should see it.
//!
//! ## Core Modules
//!
//! - `hub`: the registry of live connections, the event model and the router
//!   that picks a fan-out target for each event.
//! - `client`: the per-connection record (mailbox, hangup signal, user).
//! - `config`: layered settings from `config/default` and `GAMEHUB_*`
//!   environment variables.
//! - `transport`: the WebSocket listener and the per-connection read and
//!   write pumps.
//! - `utils`: the crate-wide error type and logging setup.

pub mod client;
pub mod config;
pub mod hub;
pub mod transport;
pub mod utils;
