mod config;
mod document;
mod errors;
mod models;
mod preview;
mod routes;
mod session;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume editor v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Session limit: {}, idle TTL: {}s",
        config.max_sessions, config.session_ttl_secs
    );

    let cors = if config.cors_permissive {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };

    let state = AppState::new(config.clone());
    let reaper = session::start_reaper(
        Arc::clone(&state.sessions),
        session::reaper::SWEEP_INTERVAL,
    );

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    reaper.abort();

    Ok(())
}
