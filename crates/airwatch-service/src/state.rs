//! Application state shared across handlers.
//!
//! # Live Feed Behavior
//!
//! WebSocket clients subscribe to the pipeline's broadcast channel of
//! accepted readings:
//!
//! - **Buffer size**: configurable via `server.broadcast_buffer` (default: 100)
//! - **Message loss**: a subscriber that falls behind by more than the buffer
//!   loses the oldest events and is told how many it missed
//! - **No blocking**: ingestion never waits on a slow subscriber
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:5000"
//! broadcast_buffer = 200  # Larger buffer for slow clients
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use time::OffsetDateTime;
use tokio::sync::watch;

use airwatch_core::IngestionPipeline;

use crate::config::Config;

/// Shared application state.
pub struct AppState {
    /// The analytics engine and reading history.
    pub pipeline: IngestionPipeline,
    /// Configuration the service was started with.
    pub config: Config,
    /// Simulator control state.
    pub collector: CollectorState,
}

impl AppState {
    /// Create application state from configuration.
    ///
    /// # Errors
    ///
    /// Fails if the configured history, thresholds or AQI tables are invalid.
    pub fn new(config: Config) -> airwatch_core::Result<Arc<Self>> {
        let pipeline = IngestionPipeline::new(config.pipeline_config())?;
        Ok(Self::with_pipeline(pipeline, config))
    }

    /// Create application state around an existing pipeline.
    pub fn with_pipeline(pipeline: IngestionPipeline, config: Config) -> Arc<Self> {
        Arc::new(Self {
            pipeline,
            config,
            collector: CollectorState::new(),
        })
    }
}

/// State for tracking and controlling the simulator.
pub struct CollectorState {
    running: AtomicBool,
    submitted: AtomicU64,
    rejected: AtomicU64,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
}

impl CollectorState {
    /// Create a new collector state.
    pub fn new() -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            running: AtomicBool::new(false),
            submitted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            stop_tx,
            stop_rx,
        }
    }

    /// Check if the simulator is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Mark the simulator as started or stopped.
    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    /// Record the outcome of one simulated submission.
    pub fn record(&self, accepted: bool) {
        let counter = if accepted {
            &self.submitted
        } else {
            &self.rejected
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Readings the simulator has had accepted.
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Readings the simulator has had rejected.
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Get a receiver for the stop signal.
    pub fn subscribe_stop(&self) -> watch::Receiver<bool> {
        self.stop_rx.clone()
    }

    /// Signal the simulator to stop.
    pub fn signal_stop(&self) {
        let _ = self.stop_tx.send(true);
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Default for CollectorState {
    fn default() -> Self {
        Self::new()
    }
}

/// Current time as seen by request handlers.
pub fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}
