/// Relay wire messages
/// JSON, one message per datagram, tagged by `type`:
///
/// ```text
/// {"type":"position","device_id":"..","fix":{..}}
/// {"type":"bump","event":{..}}
/// {"type":"history","events":[..]}   relay -> client, on connect
/// ```
use serde::{Deserialize, Serialize};

use crate::types::{BumpEvent, PositionFix};

/// Most recent bumps the relay replays to a newly connected client
pub const RELAY_HISTORY_LIMIT: usize = 5_000;

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    Position { device_id: String, fix: PositionFix },
    Bump { event: BumpEvent },
    History { events: Vec<BumpEvent> },
}

impl WireMessage {
    pub fn position(device_id: impl Into<String>, fix: PositionFix) -> Self {
        WireMessage::Position {
            device_id: device_id.into(),
            fix,
        }
    }

    pub fn bump(event: BumpEvent) -> Self {
        WireMessage::Bump { event }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            WireMessage::Position { .. } => "position",
            WireMessage::Bump { .. } => "bump",
            WireMessage::History { .. } => "history",
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, WireError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn encode(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
