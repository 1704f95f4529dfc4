//! SocketPool Transport Layer
//!
//! Connects an axum HTTP server to a [`ConnectionPool`](socketpool_core::ConnectionPool).
//! The transport layer handles:
//! - HTTP upgrade to WebSocket on a configurable path
//! - Connection lifecycle (open, inbound events, close)
//! - Writing queued outbound events to each socket
//! - Closing every socket when the server stops
//!
//! Hosts that run their own listener call [`SocketTransport::attach`] on
//! their router; [`TransportServer`] binds and serves a router itself.

pub mod error;
pub mod server;
pub mod socket;

pub use error::TransportError;
pub use server::{TransportConfig, TransportServer};
pub use socket::SocketTransport;
