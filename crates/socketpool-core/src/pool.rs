//! ConnectionPool — live connections indexed by identifier.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::Serialize;
use socketpool_protocol::EventMessage;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::handlers::{ConnectionHandler, HandlerTable};
use crate::session::Session;

/// Opaque identifier assigned to a connection when it is accepted.
pub type ConnectionId = String;

/// The pool's view of one open connection.
pub(crate) struct LiveConnection {
    /// Encoded frames waiting for the transport writer
    pub(crate) outbound: mpsc::UnboundedSender<String>,
    pub(crate) handlers: Arc<HandlerTable>,
    pub(crate) connected_at: Instant,
}

#[derive(Default)]
struct PoolInner {
    connections: RwLock<HashMap<ConnectionId, LiveConnection>>,
    connection_handlers: RwLock<Vec<ConnectionHandler>>,
}

/// The set of live connections plus the callbacks run when one opens.
///
/// Cloning is cheap; every clone refers to the same pool. Only the
/// transport (through [`Session`]) adds or removes connections.
#[derive(Clone, Default)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `handler` once for every connection accepted from now on.
    ///
    /// The handler receives the new connection and the pool. This is the
    /// place to attach event handlers with [`Connection::on`]; nothing is
    /// read from the socket until every connection handler has returned.
    pub fn on_connection<F>(&self, handler: F)
    where
        F: Fn(Connection, ConnectionPool) + Send + Sync + 'static,
    {
        self.inner.connection_handlers.write().push(Arc::new(handler));
    }

    /// Send `event` to the connection identified by `id`.
    ///
    /// Returns `false` and logs when `id` is not live. That is expected
    /// whenever a peer disconnects while a reply is in flight.
    pub fn send_to(&self, id: &str, event: &str, payload: impl Serialize) -> bool {
        let outbound = self.inner.connections.read().get(id).map(|c| c.outbound.clone());
        let Some(outbound) = outbound else {
            warn!("Cannot emit {event} to disconnected socket {id}");
            return false;
        };

        let Some(frame) = encode(event, payload) else {
            return false;
        };
        if outbound.send(frame).is_err() {
            warn!("Cannot emit {event} to disconnected socket {id}");
            return false;
        }
        true
    }

    /// Send `event` to every connection live at the time of the call.
    ///
    /// Returns how many connections the event was queued on. A connection
    /// whose writer has already gone away is skipped.
    pub fn broadcast(&self, event: &str, payload: impl Serialize) -> usize {
        let Some(frame) = encode(event, payload) else {
            return 0;
        };

        let connections = self.inner.connections.read();
        let mut delivered = 0;
        for (id, conn) in connections.iter() {
            if conn.outbound.send(frame.clone()).is_ok() {
                delivered += 1;
            } else {
                debug!("Skipping broadcast of {event} to closing socket {id}");
            }
        }
        delivered
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.inner.connections.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.connections.read().is_empty()
    }

    /// Whether `id` names a live connection.
    pub fn contains(&self, id: &str) -> bool {
        self.inner.connections.read().contains_key(id)
    }

    /// Identifiers of all live connections, in no particular order.
    pub fn ids(&self) -> Vec<ConnectionId> {
        self.inner.connections.read().keys().cloned().collect()
    }

    /// Accept a new connection (transport side).
    ///
    /// Assigns an identifier, adds the connection to the live set and runs
    /// every connection handler. The returned receiver yields the encoded
    /// frames the transport must write to the socket.
    pub fn open(&self) -> (Session, mpsc::UnboundedReceiver<String>) {
        let id = uuid::Uuid::new_v4().to_string();
        let (outbound, rx) = mpsc::unbounded_channel();
        let handlers = Arc::new(HandlerTable::default());

        self.inner.connections.write().insert(
            id.clone(),
            LiveConnection {
                outbound,
                handlers: handlers.clone(),
                connected_at: Instant::now(),
            },
        );
        debug!("Connection opened: {id} (live: {})", self.len());

        let session = Session::new(id, self.clone(), handlers);

        let callbacks = self.inner.connection_handlers.read().clone();
        for callback in callbacks {
            callback(session.connection(), self.clone());
        }

        (session, rx)
    }

    // ── Internal ──────────────────────────────────────────────────────────

    pub(crate) fn handlers_of(&self, id: &str) -> Option<Arc<HandlerTable>> {
        self.inner.connections.read().get(id).map(|c| c.handlers.clone())
    }

    pub(crate) fn remove(&self, id: &str) -> Option<LiveConnection> {
        self.inner.connections.write().remove(id)
    }
}

fn encode(event: &str, payload: impl Serialize) -> Option<String> {
    let frame = serde_json::to_value(payload)
        .map_err(socketpool_protocol::ProtocolError::from)
        .and_then(|data| EventMessage::new(event, data).encode());
    match frame {
        Ok(frame) => Some(frame),
        Err(e) => {
            warn!("Cannot encode payload for {event}: {e}");
            None
        }
    }
}
