//! airwatch service - analytics HTTP API and live feed.
//!
//! Run with: `cargo run -p airwatch-service`

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use airwatch_service::{AppState, Collector, Config};

/// airwatch service - environmental analytics over HTTP.
#[derive(Parser, Debug)]
#[command(name = "airwatch-service")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config).
    #[arg(short, long)]
    bind: Option<String>,

    /// Maximum readings kept in history (overrides config).
    #[arg(long)]
    capacity: Option<usize>,

    /// Generate simulated readings in the background.
    #[arg(long)]
    simulate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("airwatch_service=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default().unwrap_or_default(),
    };

    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(capacity) = args.capacity {
        config.history.capacity = capacity;
    }
    if args.simulate {
        config.simulator.enabled = true;
    }
    config.validate()?;

    info!(
        "History capacity {} readings, retention {}h",
        config.history.capacity, config.history.retention_hours
    );
    let addr: SocketAddr = config.server.bind.parse()?;
    let state = AppState::new(config)?;

    Collector::new(Arc::clone(&state)).start();

    let app = airwatch_service::app(Arc::clone(&state));

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.collector.signal_stop();
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
