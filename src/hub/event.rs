//! Event definitions for the hub
//!
//! Every frame on the wire is one JSON envelope:
//!
//! ```json
//! { "payload_type": "game:join", "payload": { "user_id": "u1", "game_id": "g1" } }
//! ```
//!
//! Decoding happens in two steps. [`Envelope::decode`] parses the outer
//! object; a failure there is a protocol violation that ends the
//! connection. `Event::try_from(envelope)` then selects the variant from
//! `payload_type` and validates its required fields; failures there only
//! drop the offending message.
//!
//! Notes on fields:
//! - `user_id` on join/move defaults to the sender's identity when absent
//! - `game_id` on move defaults to the sender's current game when absent
//! - an absent or `null` payload is treated as an empty object

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::HubError;

pub const CONNECT: &str = "connect";
pub const DISCONNECT: &str = "disconnect";
pub const GAME_JOIN: &str = "game:join";
pub const GAME_MOVE: &str = "game:move";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "payload_type", content = "payload")]
pub enum Event {
    #[serde(rename = "connect")]
    Connect(Presence),
    #[serde(rename = "disconnect")]
    Disconnect(Presence),
    #[serde(rename = "game:join")]
    Join(JoinGame),
    #[serde(rename = "game:move")]
    Move(MovePlayer),
}

/// Payload of `connect` and `disconnect`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Presence {
    pub user_id: String,
}

impl Presence {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinGame {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub game_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovePlayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
    pub direction: String,
}

impl Event {
    /// The `payload_type` this event is sent under.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Connect(_) => CONNECT,
            Event::Disconnect(_) => DISCONNECT,
            Event::Join(_) => GAME_JOIN,
            Event::Move(_) => GAME_MOVE,
        }
    }

    pub fn encode(&self) -> Result<String, HubError> {
        serde_json::to_string(self).map_err(HubError::Encode)
    }

    /// Decode one frame. Envelope errors come back as [`HubError::Decode`];
    /// everything else is an event-level error.
    pub fn decode(bytes: &[u8]) -> Result<Self, HubError> {
        Envelope::decode(bytes)?.try_into()
    }
}

/// The outer frame, before the payload has been interpreted.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub payload_type: String,
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    pub fn decode(bytes: &[u8]) -> Result<Self, HubError> {
        serde_json::from_slice(bytes).map_err(HubError::Decode)
    }
}

/// Union of every payload field; each variant picks what it needs.
#[derive(Debug, Default, Deserialize)]
struct PayloadFields {
    user_id: Option<String>,
    game_id: Option<String>,
    direction: Option<String>,
}

impl TryFrom<Envelope> for Event {
    type Error = HubError;

    fn try_from(envelope: Envelope) -> Result<Self, Self::Error> {
        let Envelope {
            payload_type,
            payload,
        } = envelope;

        // reject before looking at the payload
        if ![CONNECT, DISCONNECT, GAME_JOIN, GAME_MOVE].contains(&payload_type.as_str()) {
            return Err(HubError::UnknownEventType(payload_type));
        }

        let fields = if payload.is_null() {
            PayloadFields::default()
        } else {
            serde_json::from_value::<PayloadFields>(payload).map_err(|source| {
                HubError::InvalidPayload {
                    payload_type: payload_type.clone(),
                    source,
                }
            })?
        };

        match payload_type.as_str() {
            CONNECT | DISCONNECT => {
                let user_id = fields
                    .user_id
                    .ok_or(HubError::Validation("user_id is required"))?;
                let presence = Presence { user_id };
                if payload_type == CONNECT {
                    Ok(Event::Connect(presence))
                } else {
                    Ok(Event::Disconnect(presence))
                }
            }
            GAME_JOIN => Ok(Event::Join(JoinGame {
                user_id: fields.user_id,
                game_id: fields
                    .game_id
                    .ok_or(HubError::Validation("game_id is required"))?,
            })),
            _ => Ok(Event::Move(MovePlayer {
                user_id: fields.user_id,
                game_id: fields.game_id,
                direction: fields
                    .direction
                    .ok_or(HubError::Validation("direction is required"))?,
            })),
        }
    }
}
