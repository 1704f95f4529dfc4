//! Protocol errors.

use thiserror::Error;

/// Failure to turn a websocket frame into an [`EventMessage`](crate::EventMessage)
/// or back.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed event frame: {0}")]
    Malformed(#[from] serde_json::Error),
}
