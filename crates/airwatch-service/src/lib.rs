//! HTTP REST API and live feed for the airwatch analytics engine.
//!
//! This crate provides a service that:
//! - Accepts sensor readings over HTTP and validates them
//! - Keeps a bounded in-memory history of accepted readings
//! - Serves the latest status, AQI, history and rolling statistics
//! - Pushes accepted readings to WebSocket clients in real time
//! - Optionally simulates a sensor for demos
//!
//! # REST API Endpoints
//!
//! - `GET /api/health` - Service health check
//! - `GET /api/current` - Latest reading with safety analysis
//! - `GET /api/history?limit=N` - Most recent readings, oldest first (default 100)
//! - `GET /api/stats?period=1h|6h|24h|7d` - Min, max, average and trend (default 24h)
//! - `GET /api/aqi` - Air quality index of the latest reading
//! - `POST /api/readings` - Submit a reading
//! - `WS /api/ws` - Real-time readings stream
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/airwatch/server.toml`:
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:5000"
//!
//! [history]
//! capacity = 10080
//! retention_hours = 168
//!
//! [thresholds]
//! co2 = { kind = "at_most", max = 1000.0 }
//! pm25 = { kind = "at_most", max = 35.0 }
//! temperature = { kind = "between", min = 10.0, max = 35.0 }
//!
//! [simulator]
//! enabled = true
//! interval_secs = 10
//! ```

pub mod api;
pub mod collector;
pub mod config;
pub mod state;
pub mod ws;

pub use collector::{Collector, ReadingSimulator};
pub use config::{
    Config, ConfigError, HistoryConfig, ServerConfig, SimulatorConfig, ValidationError,
};
pub use state::{AppState, CollectorState};

use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the full application router with tracing and permissive CORS.
///
/// The dashboard is served from a different origin, so CORS allows any.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(api::router())
        .merge(ws::router())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
