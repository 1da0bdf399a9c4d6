//! The `error` module defines the error taxonomy of the hub.
//!
//! Errors fall in two classes. Terminal errors (`Decode`, `Encode`,
//! `Transport`, `Timeout` and `HubClosed`) end the connection that produced
//! them. Everything else is local to a single event: it is logged and the
//! connection stays open.

use thiserror::Error;

use crate::client::ClientId;

#[derive(Debug, Error)]
pub enum HubError {
    /// The outer `{payload_type, payload}` envelope could not be decoded.
    #[error("malformed envelope: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("unknown payload_type `{0}`")]
    UnknownEventType(String),

    /// A payload field is present but has the wrong JSON type.
    #[error("invalid `{payload_type}` payload: {source}")]
    InvalidPayload {
        payload_type: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Validation(&'static str),

    #[error("client {0} is not registered")]
    UnknownClient(ClientId),

    #[error("failed to encode event: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(#[from] tungstenite::Error),

    #[error("{0} deadline exceeded")]
    Timeout(&'static str),

    #[error("hub is not running")]
    HubClosed,
}

impl HubError {
    /// Whether the error ends the connection it was raised on.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            HubError::Decode(_)
                | HubError::Encode(_)
                | HubError::Transport(_)
                | HubError::Timeout(_)
                | HubError::HubClosed
        )
    }
}
