//! HTTP routes and websocket event handlers for the demo host.

use std::path::PathBuf;

use axum::Router;
use serde_json::Value;
use socketpool_core::{ConnectionPool, Events};
use tower_http::services::{ServeDir, ServeFile};
use tracing::info;

/// Event the browser client sends.
pub const CLIENT_EVENT: &str = "CLIENT_EVENT";
/// Acknowledgement sent back to the client that sent [`CLIENT_EVENT`].
pub const SERVER_EVENT: &str = "SERVER_EVENT";

/// Where static content lives and how unknown routes are answered.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Directory served as-is
    pub assets_dir: PathBuf,
    /// Page served on `/`
    pub index: PathBuf,
    /// Serve the index page for every route that matches no asset, so
    /// client-side routers can own the URL
    pub browser_history: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("assets"),
            index: PathBuf::from("index.html"),
            browser_history: false,
        }
    }
}

/// Routes for `/` and the assets directory. The websocket route is added
/// separately by the transport.
pub fn build_router(config: &HostConfig) -> Router {
    let router = Router::new().route_service("/", ServeFile::new(&config.index));

    if config.browser_history {
        router.fallback_service(
            ServeDir::new(&config.assets_dir).fallback(ServeFile::new(&config.index)),
        )
    } else {
        router.fallback_service(ServeDir::new(&config.assets_dir))
    }
}

/// Log connects and disconnects, and acknowledge every [`CLIENT_EVENT`].
pub fn register_demo_handlers(pool: &ConnectionPool) {
    pool.on_connection(|connection, _pool| {
        info!("A client connected via websocket | {}", connection.id());

        let reply = connection.clone();
        connection.on(CLIENT_EVENT, move |message| {
            info!("Client sent \"{}\"", display(message));
            reply.emit(SERVER_EVENT, "Message received.");
        });

        let id = connection.id().to_string();
        connection.on(Events::DISCONNECT, move |_| {
            info!("A client disconnected from websocket | {id}");
        });
    });
}

fn display(message: &Value) -> String {
    match message {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use socketpool_core::DisconnectReason;
    use socketpool_protocol::EventMessage;

    #[test]
    fn display_unquotes_strings() {
        assert_eq!(display(&json!("hello")), "hello");
        assert_eq!(display(&json!({"a": 1})), r#"{"a":1}"#);
        assert_eq!(display(&json!(null)), "null");
    }

    #[test]
    fn client_event_is_acknowledged_to_sender_only() {
        let pool = ConnectionPool::new();
        register_demo_handlers(&pool);

        let (a, mut rx_a) = pool.open();
        let (_b, mut rx_b) = pool.open();

        assert_eq!(a.dispatch(CLIENT_EVENT, &json!("hi")), 1);

        let ack = EventMessage::decode(&rx_a.try_recv().unwrap()).unwrap();
        assert_eq!(ack, EventMessage::new(SERVER_EVENT, "Message received."));
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn disconnect_handler_is_registered() {
        let pool = ConnectionPool::new();
        register_demo_handlers(&pool);

        let (a, _rx) = pool.open();
        let conn = a.connection();
        a.close(DisconnectReason::ClientClose);

        assert!(!conn.is_open());
        assert!(pool.is_empty());
    }

    #[test]
    fn default_config() {
        let config = HostConfig::default();
        assert_eq!(config.assets_dir, PathBuf::from("assets"));
        assert_eq!(config.index, PathBuf::from("index.html"));
        assert!(!config.browser_history);
    }
}
