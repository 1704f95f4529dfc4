//! Named-event envelope.
//!
//! Every websocket text frame carries exactly one event:
//!
//! ```json
//! { "event": "SERVER_EVENT", "data": "Message received." }
//! ```
//!
//! `data` may be any JSON value and is `null` when omitted. Event names are
//! free-form; the empty string is a valid name.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;

/// One named event and its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMessage {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl EventMessage {
    pub fn new(event: impl Into<String>, data: impl Into<Value>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
        }
    }

    /// Parse a text frame received from a peer.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize into the text frame sent to a peer.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}
