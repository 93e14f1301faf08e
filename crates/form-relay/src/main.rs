//! Form Relay binary.
//!
//! Loads `.env` if present, configures logging and serves until Ctrl+C.

use anyhow::{Context, Result};
use form_relay::telemetry::{self, TelemetryConfig};
use form_relay::{RelayConfig, RelayService, VERSION};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; the process environment still applies
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    // Initialize logging
    telemetry::init(&TelemetryConfig::from_env()).context("failed to initialize logging")?;
    if !dotenv_loaded {
        info!("No .env file found, using process environment");
    }

    // Load configuration
    let config = RelayConfig::from_env();
    config.validate().context("invalid relay configuration")?;

    info!(version = VERSION, "Starting form relay");

    let service = RelayService::new(config).context("failed to build relay")?;
    service
        .serve(shutdown_signal())
        .await
        .context("relay server failed")?;

    Ok(())
}

/// Resolves on Ctrl+C.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => warn!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
    }
}
