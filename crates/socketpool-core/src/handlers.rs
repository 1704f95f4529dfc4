//! Per-connection event handler table.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::connection::Connection;
use crate::pool::ConnectionPool;

/// Callback for a named event received on one connection.
pub type EventHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Callback run once per accepted connection.
pub type ConnectionHandler = Arc<dyn Fn(Connection, ConnectionPool) + Send + Sync>;

/// Event name → handlers, in registration order.
///
/// Handlers are cloned out before they run, so a handler may register
/// further handlers on the same table.
#[derive(Default)]
pub(crate) struct HandlerTable {
    handlers: RwLock<HashMap<String, Vec<EventHandler>>>,
}

impl HandlerTable {
    pub(crate) fn add(&self, event: String, handler: EventHandler) {
        self.handlers.write().entry(event).or_default().push(handler);
    }

    /// Run every handler registered for `event`. Returns how many ran.
    pub(crate) fn invoke(&self, event: &str, payload: &Value) -> usize {
        let handlers = match self.handlers.read().get(event) {
            Some(list) => list.clone(),
            None => return 0,
        };
        for handler in &handlers {
            handler(payload);
        }
        handlers.len()
    }

    pub(crate) fn clear(&self) {
        self.handlers.write().clear();
    }
}
