//! SocketPool — demo websocket host
//!
//! Serves a static front end and a websocket endpoint backed by a
//! connection pool. Clients send `CLIENT_EVENT`; the server acknowledges
//! each one with `SERVER_EVENT`.
//!
//! Usage:
//!   socketpool                                   # Port 3000, ./assets, ./index.html
//!   socketpool --port 8080                       # Custom port
//!   socketpool --assets public --index public/index.html
//!   socketpool --browser-history                 # Unknown routes serve the index page

use std::path::PathBuf;

use clap::Parser;
use socketpool::{HostConfig, build_router, register_demo_handlers};
use socketpool_core::ConnectionPool;
use socketpool_transport::{TransportConfig, TransportServer};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "socketpool", about = "SocketPool — websocket connection pool demo server")]
struct Cli {
    /// Port to listen on (0 for OS-assigned)
    #[arg(long, default_value = "3000")]
    port: u16,

    /// Hostname to bind to
    #[arg(long, default_value = "127.0.0.1")]
    hostname: String,

    /// Route that accepts websocket upgrades
    #[arg(long, default_value = "/ws")]
    ws_path: String,

    /// Directory of static assets
    #[arg(long, default_value = "assets")]
    assets: PathBuf,

    /// Page served on `/`
    #[arg(long, default_value = "index.html")]
    index: PathBuf,

    /// Serve the index page for every unknown route
    #[arg(long)]
    browser_history: bool,

    /// Maximum concurrent connections (unlimited if omitted)
    #[arg(long)]
    max_connections: Option<usize>,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn init_tracing(cli: &Cli) {
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if let Some(ref log_path) = cli.log_file {
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let file = match std::fs::OpenOptions::new().create(true).append(true).open(log_path) {
            Ok(file) => file,
            Err(e) => {
                eprintln!("Failed to open log file {}: {e}", log_path.display());
                std::process::exit(1);
            }
        };

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .init();

        eprintln!("Logging to {}", log_path.display());
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    let host_config = HostConfig {
        assets_dir: cli.assets.clone(),
        index: cli.index.clone(),
        browser_history: cli.browser_history,
    };

    let transport_config = TransportConfig {
        port: cli.port,
        hostname: cli.hostname.clone(),
        path: cli.ws_path.clone(),
        max_connections: cli.max_connections,
        verbose_logging: cli.verbose,
    };

    let pool = ConnectionPool::new();
    register_demo_handlers(&pool);

    let app = build_router(&host_config);
    let mut server = match TransportServer::start(transport_config, pool, app).await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to start server: {e}");
            std::process::exit(1);
        }
    };

    println!();
    println!("  SocketPool server running");
    println!();
    println!("  HTTP:       http://{}", server.local_addr());
    println!("  WebSocket:  ws://{}{}", server.local_addr(), cli.ws_path);
    println!("  Assets:     {}", host_config.assets_dir.display());
    println!("  Index:      {}", host_config.index.display());
    if host_config.browser_history {
        println!("  Routing:    browser history (unknown routes serve the index)");
    }
    println!();
    println!("  Press Ctrl+C to stop.");
    println!();

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {e}");
    }

    println!();
    println!("  Shutting down...");
    server.stop().await;
    println!("  Server stopped.");
}
