//! WebSocket upgrade and per-connection task.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use socketpool_core::{ConnectionPool, DisconnectReason, Session};
use socketpool_protocol::EventMessage;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::server::TransportConfig;

/// Shared state for the upgrade and health routes.
struct AppState {
    pool: ConnectionPool,
    config: TransportConfig,
    /// Flips to `true` once; every connection task then closes its socket
    shutdown_tx: watch::Sender<bool>,
    /// Upgrades accepted and not yet finished, counted from the handshake
    active: AtomicUsize,
}

/// One reserved place under `max_connections`, released on drop.
struct ConnectionSlot {
    state: Arc<AppState>,
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.state.active.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Reserve a slot, or `None` if `max_connections` are already taken.
fn try_reserve(state: &Arc<AppState>) -> Option<ConnectionSlot> {
    let max = state.config.max_connections.unwrap_or(usize::MAX);
    state
        .active
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < max).then_some(n + 1))
        .ok()?;
    Some(ConnectionSlot {
        state: state.clone(),
    })
}

/// Feeds websocket connections accepted by an axum router into a pool.
#[derive(Clone)]
pub struct SocketTransport {
    state: Arc<AppState>,
}

impl SocketTransport {
    pub fn new(pool: ConnectionPool, config: TransportConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            state: Arc::new(AppState {
                pool,
                config,
                shutdown_tx,
                active: AtomicUsize::new(0),
            }),
        }
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.state.pool
    }

    /// Add the websocket route (`config.path`) and `/health` to `router`.
    pub fn attach(&self, router: Router) -> Router {
        let routes = Router::new()
            .route(&self.state.config.path, get(ws_upgrade_handler))
            .route("/health", get(health_handler))
            .with_state(self.state.clone());
        router.merge(routes)
    }

    /// Close every open socket with [`DisconnectReason::ServerShutdown`]
    /// and refuse further upgrades.
    pub fn close_all(&self) {
        self.state.shutdown_tx.send_replace(true);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn ws_upgrade_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    if *state.shutdown_tx.borrow() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    // Held until the connection task ends; a failed upgrade drops it unused.
    let Some(slot) = try_reserve(&state) else {
        let max = state.config.max_connections.unwrap_or_default();
        warn!("Connection rejected: max connections reached ({max})");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };

    ws.on_upgrade(move |socket| handle_ws_connection(socket, state, slot))
        .into_response()
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "clients": state.pool.len(),
    }))
}

// ─────────────────────────────────────────────────────────────────────────────
// WebSocket Connection Handler
// ─────────────────────────────────────────────────────────────────────────────

async fn handle_ws_connection(socket: WebSocket, state: Arc<AppState>, _slot: ConnectionSlot) {
    let mut shutdown_rx = state.shutdown_tx.subscribe();
    if *shutdown_rx.borrow() {
        return;
    }

    // Connection handlers run here, before the first read.
    let (session, mut outbound_rx) = state.pool.open();
    let client_id = session.id().to_string();
    if state.config.verbose_logging {
        info!("Client connected: {client_id} (total: {})", state.pool.len());
    } else {
        debug!("Client connected: {client_id}");
    }

    let (mut ws_tx, mut ws_rx) = socket.split();

    let reason = loop {
        tokio::select! {
            // Incoming WebSocket message
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_frame(&session, text.as_str());
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if ws_tx.send(Message::Pong(data)).await.is_err() {
                            break DisconnectReason::TransportError;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break DisconnectReason::ClientClose;
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error for {client_id}: {e}");
                        break DisconnectReason::TransportError;
                    }
                    _ => {}
                }
            }

            // Events queued for this client
            Some(frame) = outbound_rx.recv() => {
                if let Err(e) = ws_tx.send(Message::Text(frame.into())).await {
                    error!("Failed to send to {client_id}: {e}");
                    break DisconnectReason::TransportError;
                }
            }

            // Server stopping
            _ = shutdown_rx.changed() => {
                let _ = ws_tx.send(Message::Close(None)).await;
                break DisconnectReason::ServerShutdown;
            }
        }
    };

    session.close(reason);
    if state.config.verbose_logging {
        info!("Client disconnected: {client_id} ({reason}, total: {})", state.pool.len());
    } else {
        debug!("Client disconnected: {client_id} ({reason})");
    }
}

/// Decode one text frame and hand it to the connection's handlers.
fn handle_frame(session: &Session, text: &str) {
    match EventMessage::decode(text) {
        Ok(msg) => {
            if session.dispatch(&msg.event, &msg.data) == 0 {
                debug!("No handler for {} on {}", msg.event, session.id());
            }
        }
        Err(e) => {
            warn!("Dropping frame from {}: {e}", session.id());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn transport() -> SocketTransport {
        SocketTransport::new(ConnectionPool::new(), TransportConfig::default())
    }

    #[tokio::test]
    async fn health_reports_client_count() {
        let transport = transport();
        let (_session, _rx) = transport.pool().open();
        let app = transport.attach(Router::new());

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, json!({"status": "ok", "clients": 1}));
    }

    #[tokio::test]
    async fn attach_keeps_host_routes() {
        let transport = transport();
        let app = transport.attach(Router::new().route("/", get(|| async { "index" })));

        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"index");
    }

    #[tokio::test]
    async fn plain_get_on_ws_path_is_not_upgraded() {
        let transport = transport();
        let app = transport.attach(Router::new());

        let response = app
            .oneshot(Request::get("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_client_error());
        assert!(transport.pool().is_empty());
    }

    #[test]
    fn close_all_is_sticky() {
        let transport = transport();
        assert!(!*transport.state.shutdown_tx.borrow());
        transport.close_all();
        transport.close_all();
        assert!(*transport.state.shutdown_tx.borrow());
    }

    #[test]
    fn reserve_respects_max_connections() {
        let config = TransportConfig {
            max_connections: Some(1),
            ..Default::default()
        };
        let transport = SocketTransport::new(ConnectionPool::new(), config);

        let first = try_reserve(&transport.state);
        assert!(first.is_some());
        assert!(try_reserve(&transport.state).is_none());

        drop(first);
        assert_eq!(transport.state.active.load(Ordering::Acquire), 0);
        assert!(try_reserve(&transport.state).is_some());
    }

    #[test]
    fn concurrent_reserves_never_exceed_max() {
        let config = TransportConfig {
            max_connections: Some(3),
            ..Default::default()
        };
        let transport = SocketTransport::new(ConnectionPool::new(), config);

        let slots: Vec<Option<ConnectionSlot>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|_| scope.spawn(|| try_reserve(&transport.state)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(slots.iter().filter(|s| s.is_some()).count(), 3);
        assert_eq!(transport.state.active.load(Ordering::Acquire), 3);
    }

    #[test]
    fn unlimited_when_no_max() {
        let transport = transport();
        let slots: Vec<_> = (0..100).map(|_| try_reserve(&transport.state)).collect();
        assert!(slots.iter().all(Option::is_some));
    }

    #[test]
    fn dispatches_decoded_frames() {
        let pool = ConnectionPool::new();
        let (session, _rx) = pool.open();
        let hits = Arc::new(AtomicUsize::new(0));

        let h = hits.clone();
        session.connection().on("CLIENT_EVENT", move |payload| {
            assert_eq!(payload, &json!("hello"));
            h.fetch_add(1, Ordering::Relaxed);
        });

        handle_frame(&session, r#"{"event":"CLIENT_EVENT","data":"hello"}"#);
        handle_frame(&session, "garbage");
        handle_frame(&session, r#"{"event":"disconnect"}"#);

        assert_eq!(hits.load(Ordering::Relaxed), 1);
        assert!(pool.contains(session.id()));
    }
}
