//! Reserved event names and disconnect reasons.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Event names owned by the transport. Peers cannot trigger them.
pub struct Events;

impl Events {
    /// Fired on the pool once per accepted connection.
    pub const CONNECTION: &str = "connection";

    /// Fired on a connection after it has left the live set.
    pub const DISCONNECT: &str = "disconnect";

    /// Whether `event` is one of the names above.
    pub fn is_reserved(event: &str) -> bool {
        matches!(event, Self::CONNECTION | Self::DISCONNECT)
    }
}

/// Why a connection moved to the closed state. Delivered as the payload of
/// the [`Events::DISCONNECT`] event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
    /// The peer sent a close frame or the stream ended.
    ClientClose,
    /// The session was dropped without an explicit close.
    TransportClose,
    /// Reading from or writing to the socket failed.
    TransportError,
    /// The hosting server is stopping.
    ServerShutdown,
}

impl DisconnectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientClose => "client close",
            Self::TransportClose => "transport close",
            Self::TransportError => "transport error",
            Self::ServerShutdown => "server shutdown",
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<DisconnectReason> for serde_json::Value {
    fn from(reason: DisconnectReason) -> Self {
        serde_json::Value::String(reason.as_str().to_string())
    }
}
