//! Standalone listener for hosts that don't run their own.
//!
//! Binds a TCP listener, serves the host's router with the websocket
//! routes attached, and shuts both down on [`TransportServer::stop`].

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::Router;
use socketpool_core::ConnectionPool;
use tokio::sync::mpsc;
use tracing::info;

use crate::error::TransportError;
use crate::socket::SocketTransport;

/// Transport server configuration.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Port to listen on (0 for OS-assigned)
    pub port: u16,
    /// Hostname to bind to
    pub hostname: String,
    /// Route that accepts websocket upgrades
    pub path: String,
    /// Maximum concurrent connections
    pub max_connections: Option<usize>,
    /// Log every connect and disconnect at info level
    pub verbose_logging: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            hostname: "127.0.0.1".into(),
            path: "/ws".into(),
            max_connections: None,
            verbose_logging: false,
        }
    }
}

/// A running HTTP server with the pool's websocket route attached.
pub struct TransportServer {
    transport: SocketTransport,
    /// Shutdown signal
    shutdown_tx: Option<mpsc::Sender<()>>,
    /// Server task handle
    handle: Option<tokio::task::JoinHandle<()>>,
    /// Actual bound address
    local_addr: SocketAddr,
}

impl TransportServer {
    /// Attach `pool` to `app` and start serving on the configured address.
    pub async fn start(
        config: TransportConfig,
        pool: ConnectionPool,
        app: Router,
    ) -> Result<Self, TransportError> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let addr = listen_addr(&config)?;
        let path = config.path.clone();

        let transport = SocketTransport::new(pool, config);
        let app = transport.attach(app);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        info!("SocketPool listening on ws://{local_addr}{path}");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                })
                .await
                .ok();
        });

        Ok(Self {
            transport,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
            local_addr,
        })
    }

    pub fn pool(&self) -> &ConnectionPool {
        self.transport.pool()
    }

    /// Get the actual bound port.
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Close every socket, then stop accepting HTTP requests.
    pub async fn stop(&mut self) {
        self.transport.close_all();
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        info!("SocketPool server stopped");
    }
}

/// Resolve the configured hostname and port into a bind address.
///
/// Accepts IPv4 and IPv6 literals (bracketed or not) and `localhost`.
fn listen_addr(config: &TransportConfig) -> Result<SocketAddr, TransportError> {
    let host = config.hostname.trim_start_matches('[').trim_end_matches(']');
    let ip = if host.eq_ignore_ascii_case("localhost") {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    } else {
        host.parse()?
    };
    Ok(SocketAddr::new(ip, config.port))
}
