//! `glucovault` — vault binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (JSON logs, optional OTLP export).
//! 3. Decode the current and legacy keys into a [`KeyRing`].
//! 4. Build the Axum router and start the HTTP server.

mod config;
mod crypto;
mod records;
mod server;
mod telemetry;

use anyhow::Result;
use tracing::{info, warn};

use config::Config;
use crypto::FieldCipher;
use server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_port = cfg.listen_port,
        "glucovault starting"
    );

    // -----------------------------------------------------------------------
    // 3. Keys
    // -----------------------------------------------------------------------
    let keys = cfg.key_ring()?;
    if keys.legacy_is_default() {
        warn!("ENCRYPTION_SECRET_KEY0 is unset; using the built-in development legacy key");
    }
    let iv_tables = cfg.iv_tables();
    if iv_tables.is_empty() {
        warn!("IV_TABLES is empty; every sensitive value will be stored as marked plaintext");
    }
    info!(iv_tables = iv_tables.len(), "keys loaded");

    // -----------------------------------------------------------------------
    // 4. HTTP server
    // -----------------------------------------------------------------------
    let state = AppState::new(FieldCipher::new(keys), iv_tables);
    let router = server::router::build(state);

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
