//! SocketPool - Protocol Types
//!
//! The wire envelope exchanged over each websocket connection, the event
//! names reserved by the transport, and the reasons a connection can close.
//! Application events are free-form; this crate only fixes their framing.

pub mod envelope;
pub mod error;
pub mod events;

pub use envelope::EventMessage;
pub use error::ProtocolError;
pub use events::{DisconnectReason, Events};
