//! SocketPool Core — the connection pool.
//!
//! A [`ConnectionPool`] owns every live websocket connection, keyed by the
//! identifier the transport assigned at accept time. Application code
//! registers a new-connection callback on the pool, attaches named-event
//! handlers to each [`Connection`] it is handed, and sends either to one
//! connection by identifier or to all of them.
//!
//! Sending to an identifier that is no longer live is a logged no-op:
//! a peer disconnecting while a reply is in flight is normal.
//!
//! The transport drives each connection through a [`Session`] obtained
//! from [`ConnectionPool::open`].

mod connection;
mod handlers;
mod pool;
mod session;

pub use connection::{Connection, ConnectionState};
pub use handlers::{ConnectionHandler, EventHandler};
pub use pool::{ConnectionId, ConnectionPool};
pub use session::Session;

pub use socketpool_protocol::{DisconnectReason, Events};
