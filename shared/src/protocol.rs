//! Text wire protocol
//!
//! Every message is one JSON object carrying a `type` tag. Traffic is split into
//! two closed sets: [`ClientCommand`] for client→server frames and
//! [`ServerNotice`] for server→client frames.

use crate::{Direction, Side};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("message is missing its type tag")]
    MissingType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallSnapshot {
    pub x: i32,
    pub y: i32,
    pub motion_direction_x: Direction,
    pub motion_direction_y: Direction,
    pub speed: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaddleSnapshot {
    pub y: i32,
    pub side: Side,
}

/// Full serialized game state sent after every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStateSnapshot {
    pub ready: bool,
    pub turn: Side,
    pub ball: BallSnapshot,
    pub players: BTreeMap<Side, PaddleSnapshot>,
}

/// Frames a client may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientCommand {
    Move { direction: Direction },
    Close,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl ClientCommand {
    /// Decodes one inbound frame.
    ///
    /// Returns `Ok(None)` for well-formed messages whose type the server does not
    /// handle; those are ignored rather than treated as errors.
    pub fn decode(text: &str) -> Result<Option<Self>, ProtocolError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let envelope = Envelope::deserialize(&value)?;
        match envelope.kind.as_deref() {
            Some("move") | Some("close") => Ok(Some(serde_json::from_value(value)?)),
            Some(_) => Ok(None),
            None => Err(ProtocolError::MissingType),
        }
    }

    /// Serializes the command as a single JSON text frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Frames the server sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerNotice {
    Connected {
        #[serde(rename = "playerSide")]
        player_side: Side,
    },
    Full,
    State {
        state: GameStateSnapshot,
    },
}

impl ServerNotice {
    /// Parses a notice received from the server.
    ///
    /// Unlike [`ClientCommand::decode`], an unknown `type` is an error here.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serializes the notice as a single JSON text frame.
    ///
    /// The server encodes each state snapshot once and sends the same frame to
    /// every seated player.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}
