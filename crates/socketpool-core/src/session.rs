//! Transport-side handle for one open connection.

use std::sync::Arc;

use serde_json::Value;
use socketpool_protocol::{DisconnectReason, Events};
use tracing::debug;

use crate::connection::Connection;
use crate::handlers::HandlerTable;
use crate::pool::{ConnectionId, ConnectionPool};

/// Owned by the task serving one socket. Feeds inbound events to the
/// connection's handlers and takes the connection out of the pool when
/// the socket goes away.
///
/// Dropping a session that was not closed explicitly closes it with
/// [`DisconnectReason::TransportClose`].
pub struct Session {
    id: ConnectionId,
    pool: ConnectionPool,
    handlers: Arc<HandlerTable>,
    closed: bool,
}

impl Session {
    pub(crate) fn new(id: ConnectionId, pool: ConnectionPool, handlers: Arc<HandlerTable>) -> Self {
        Self {
            id,
            pool,
            handlers,
            closed: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Application-facing handle for this connection.
    pub fn connection(&self) -> Connection {
        Connection::new(self.id.clone(), self.pool.clone())
    }

    /// Deliver an event received from the peer. Returns how many handlers ran.
    ///
    /// Reserved event names cannot be triggered by a peer and are dropped.
    pub fn dispatch(&self, event: &str, payload: &Value) -> usize {
        if Events::is_reserved(event) {
            debug!("Ignoring reserved event {event} from socket {}", self.id);
            return 0;
        }
        self.handlers.invoke(event, payload)
    }

    /// Remove the connection from the pool and fire its `disconnect` handlers.
    pub fn close(mut self, reason: DisconnectReason) {
        self.finish(reason);
    }

    fn finish(&mut self, reason: DisconnectReason) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Some(conn) = self.pool.remove(&self.id) {
            debug!(
                "Connection closed: {} ({reason}, open for {:?})",
                self.id,
                conn.connected_at.elapsed()
            );
        }

        let payload: Value = reason.into();
        self.handlers.invoke(Events::DISCONNECT, &payload);
        self.handlers.clear();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.finish(DisconnectReason::TransportClose);
    }
}
