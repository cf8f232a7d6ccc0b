//! aeroscan-demo - Road inspection demo server
//!
//! Serves the three-step Upload → Processing → Results workflow over HTTP,
//! with one independent in-memory session per visitor.

use std::path::PathBuf;

use aeroscan_common::config::{ConfigOverrides, ConfigResolver, ConfigSource};
use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aeroscan_demo::{AppState, SESSION_SWEEP_INTERVAL};

/// Command-line arguments for aeroscan-demo
#[derive(Parser, Debug)]
#[command(name = "aeroscan-demo")]
#[command(about = "Drone road-inspection demo server")]
#[command(version)]
struct Args {
    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Seed for the synthetic defect generator
    #[arg(long)]
    seed: Option<u64>,

    /// Number of synthetic defects per project
    #[arg(long)]
    defect_count: Option<usize>,

    /// Pause per processing phase, in milliseconds
    #[arg(long)]
    phase_delay_ms: Option<u64>,

    /// Discard sessions idle for this many seconds
    #[arg(long)]
    session_ttl_secs: Option<u64>,

    /// Log level when RUST_LOG is not set (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// TOML config file (default: <config dir>/aeroscan/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            seed: self.seed,
            defect_count: self.defect_count,
            phase_delay_ms: self.phase_delay_ms,
            session_ttl_secs: self.session_ttl_secs,
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let resolver = ConfigResolver::new(args.config.clone());
    let (config, source) = resolver
        .resolve_with_source(&args.overrides())
        .context("Failed to load configuration")?;

    // Initialize tracing
    let default_filter = format!(
        "aeroscan_demo={level},aeroscan_common={level},tower_http={level}",
        level = config.logging.level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting AeroScan demo v{}", env!("CARGO_PKG_VERSION"));
    // Resolution ran before the subscriber existed; report it now
    match &source {
        ConfigSource::File(path) => info!("Loaded config file {}", path.display()),
        ConfigSource::Missing(path) => warn!(
            "Config file {} not found, using environment and defaults",
            path.display()
        ),
        ConfigSource::NoPath => info!("No config directory, using environment and defaults"),
    }
    debug!(?config, "Configuration resolved");
    info!(
        seed = config.seed,
        defect_count = config.defect_count,
        phase_delay_ms = config.phase_delay_ms,
        session_ttl_secs = config.session_ttl_secs,
        "Demo data settings"
    );

    let addr = config.bind_address();
    let state = AppState::new(config);
    let sweeper = state.spawn_session_sweeper(SESSION_SWEEP_INTERVAL);
    let app = aeroscan_demo::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    sweeper.abort();

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
