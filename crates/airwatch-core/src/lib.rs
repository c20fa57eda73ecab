//! Analytics engine for environmental sensor readings.
//!
//! This crate turns a stream of sensor samples (temperature, humidity, CO2,
//! PM2.5, PM10 and light) into the answers a monitoring dashboard needs:
//!
//! - **Safety analysis**: per-parameter safe ranges and an overall
//!   safe/warning/hazard status ([`ThresholdAnalyzer`])
//! - **Air quality index**: EPA-style piecewise-linear sub-indices with
//!   category and color ([`AqiCalculator`])
//! - **Rolling statistics**: min, max, average and trend over a time window
//!   ([`StatsAggregator`])
//! - **Bounded history**: time-ordered storage with lock-free reads
//!   ([`HistoryStore`])
//!
//! [`IngestionPipeline`] wires these together behind a single entry point.
//! All computation is synchronous and pure CPU; there is no I/O here.
//!
//! # Quick Start
//!
//! ```
//! use airwatch_core::IngestionPipeline;
//! use airwatch_types::{AqiCategory, Period, ReadingInput, Status};
//! use time::OffsetDateTime;
//!
//! let pipeline = IngestionPipeline::default();
//! let now = OffsetDateTime::now_utc();
//!
//! let input = ReadingInput {
//!     timestamp: None,
//!     temperature: Some(22.0),
//!     humidity: Some(50.0),
//!     co2: Some(400.0),
//!     pm25: Some(10.0),
//!     pm10: Some(20.0),
//!     light: Some(1000.0),
//! };
//!
//! let accepted = pipeline.submit(&input, now).unwrap();
//! assert_eq!(accepted.analysis.status, Status::Safe);
//! assert_eq!(accepted.aqi.category, AqiCategory::Good);
//!
//! let stats = pipeline.stats(Period::OneHour, now);
//! assert_eq!(stats.co2.max, 400.0);
//! ```

pub mod aqi;
pub mod error;
pub mod history;
pub mod pipeline;
pub mod stats;
pub mod thresholds;
pub mod validation;

pub use aqi::{AQI_POLLUTANTS, AqiCalculator, AqiTables, Breakpoint, BreakpointTable, CategoryBand};
pub use error::{Error, Result};
pub use history::{AppendOutcome, DEFAULT_CAPACITY, HistorySnapshot, HistoryStore};
pub use pipeline::{
    Current, DEFAULT_BROADCAST_BUFFER, IngestionPipeline, PipelineConfig, ReadingEvent,
    ReadingReceiver, ReadingSender,
};
pub use stats::{StatsAggregator, TrendConfig};
pub use thresholds::{SafeRange, ThresholdAnalyzer, ThresholdConfig, Violation};
pub use validation::{
    ReadingValidator, Validated, ValidationError, ValidationWarning, ValidatorConfig,
};

// Re-export the shared data model so downstream crates need only this one.
pub use airwatch_types as types;
