//! Map/mode veto ceremony server.
//!
//! Spawns one actor per lobby behind a Socket.IO event channel, with
//! read-only HTTP query endpoints for the web UI and overlays.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use ctrlc::set_handler;
use map_veto::{LobbyRegistry, RuntimeSettings};
use mv_server::config::ServerConfig;
use mv_server::sink::SocketSink;
use mv_server::{api, logging, socket};
use pico_args::Arguments;
use socketioxide::SocketIo;
use tower_http::cors::CorsLayer;
use tracing::info;

const HELP: &str = "\
Run a map/mode veto ceremony server

USAGE:
  mv_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:3000]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  PUBLIC_URL               Socket URL handed to the web UI
  COIN_FLIP_DEFAULT        Default coin flip flag for new lobbies
  RUST_LOG                 Log filter (e.g., info,mv_server=debug)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind_override: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    logging::init();

    let config = ServerConfig::from_env(bind_override)?;
    config.validate()?;
    info!("Starting veto ceremony server at {}", config.bind);

    let (layer, io) = SocketIo::new_layer();
    let sink = Arc::new(SocketSink::new(io.clone()));
    let registry = Arc::new(LobbyRegistry::with_settings(
        sink,
        RuntimeSettings {
            coin_flip: config.coin_flip_default,
            ..RuntimeSettings::default()
        },
    ));

    socket::register(&io, registry.clone());

    let state = api::AppState {
        registry,
        public_url: config.public_url.clone(),
    };
    let app = api::create_router(state)
        .layer(CorsLayer::permissive())
        .layer(layer);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
}
