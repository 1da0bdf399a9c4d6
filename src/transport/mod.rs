//! The `transport` module is responsible for handling network communication
//! with clients via WebSockets.
//!
//! It accepts connections, extracts the user id from the request path and
//! runs the per-connection reader and writer pumps that move frames between
//! the socket and the hub.

pub mod pump;
pub mod websocket;

pub use websocket::{register_connection, serve, start_websocket_server};

#[cfg(test)]
mod websocket_tests;
