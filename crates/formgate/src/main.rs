//! # Formgate - CAPTCHA verification gate for web forms
//!
//! Form-submission handlers post the widget token and their form ID; Formgate
//! rejects replays, asks the reCAPTCHA siteverify API for a score, and
//! answers accept or reject according to the form's action/score policy.
//!
//! ## Architecture
//! ```text
//! Form handler → Formgate → siteverify
//!                   ↓
//!                Redis (replay markers)
//! ```

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use formgate::config::{AppConfig, ConfigOverrides};
use formgate::routes;
use formgate::state::AppState;

/// Formgate - CAPTCHA verification gate
#[derive(Parser, Debug)]
#[command(name = "formgate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/formgate.toml")]
    config: String,

    /// Redis URL (overrides config)
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Listen address (overrides config)
    #[arg(short, long, env = "LISTEN_ADDR")]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level, args.json_logs)?;

    info!("Starting Formgate v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let overrides = ConfigOverrides {
        redis_url: args.redis_url.clone(),
        listen_addr: args.listen.clone(),
    };
    let config = AppConfig::load(&args.config, &overrides)?;
    info!("Configuration loaded from {}", args.config);

    // Initialize application state
    let listen_addr = config.listen_addr.clone();
    let state = AppState::new(config).await?;

    // Build router
    let app = routes::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("Failed to bind {listen_addr}"))?;
    info!("Formgate listening on {}", listen_addr);

    // Handle graceful shutdown
    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Shutdown signal received");
    };

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal)
    .await
    .context("Server error")?;

    info!("Formgate shutdown complete");
    Ok(())
}

/// Initialize structured logging with tracing
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }

    Ok(())
}
