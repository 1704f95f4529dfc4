//! Application-facing handle for one connection.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::pool::{ConnectionId, ConnectionPool};

/// Lifecycle of a connection once the pool has accepted it.
///
/// A socket still mid-upgrade has no [`Connection`] yet, so there is no
/// state for it here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// In the pool's live set. Sends are delivered.
    Open,
    /// Removed from the live set. Sends are logged no-ops.
    Closed,
}

/// One connection, bound to its identifier and the pool that owns it.
///
/// Cheap to clone and safe to move into handlers; it holds no socket,
/// only the identifier. Once the connection closes every operation
/// degrades to a logged no-op.
#[derive(Clone)]
pub struct Connection {
    id: ConnectionId,
    pool: ConnectionPool,
}

impl Connection {
    pub(crate) fn new(id: ConnectionId, pool: ConnectionPool) -> Self {
        Self { id, pool }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Run `handler` whenever `event` arrives on this connection.
    ///
    /// Handlers for the same event run in registration order, once per
    /// received message. Register on [`Events::DISCONNECT`](crate::Events::DISCONNECT)
    /// to observe the close; its payload is the reason as a string.
    pub fn on<F>(&self, event: impl Into<String>, handler: F)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let event = event.into();
        match self.pool.handlers_of(&self.id) {
            Some(table) => table.add(event, Arc::new(handler)),
            None => debug!("Ignoring {event} handler for disconnected socket {}", self.id),
        }
    }

    /// Send `event` to this connection only. Same as
    /// [`ConnectionPool::send_to`] with this connection's identifier.
    pub fn emit(&self, event: &str, payload: impl Serialize) -> bool {
        self.pool.send_to(&self.id, event, payload)
    }

    pub fn state(&self) -> ConnectionState {
        if self.pool.contains(&self.id) {
            ConnectionState::Open
        } else {
            ConnectionState::Closed
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}
