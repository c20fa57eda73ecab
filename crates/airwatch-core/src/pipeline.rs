//! Ingestion pipeline tying validation, storage and analysis together.
//!
//! [`IngestionPipeline`] is the only writer of the [`HistoryStore`]. Each
//! submission is validated, stamped, appended, analyzed and then published
//! to live subscribers. Query methods read the latest published snapshot and
//! never wait on a submission in progress.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use airwatch_types::{AnalysisResult, AqiResult, Period, Reading, ReadingInput, StatsReport};

use crate::aqi::{AqiCalculator, AqiTables};
use crate::error::Result;
use crate::history::{DEFAULT_CAPACITY, HistorySnapshot, HistoryStore};
use crate::stats::{StatsAggregator, TrendConfig};
use crate::thresholds::{ThresholdAnalyzer, ThresholdConfig};
use crate::validation::{ReadingValidator, ValidatorConfig};

/// Default number of events buffered per live subscriber.
pub const DEFAULT_BROADCAST_BUFFER: usize = 100;

/// A reading accepted by the pipeline, with its derived analysis.
///
/// This is both the return value of [`IngestionPipeline::submit`] and the
/// event delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingEvent {
    #[serde(rename = "data")]
    pub reading: Reading,
    pub analysis: AnalysisResult,
    pub aqi: AqiResult,
}

/// The newest reading and its safety analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Current {
    #[serde(rename = "data")]
    pub reading: Reading,
    pub analysis: AnalysisResult,
}

/// Sender for accepted-reading events.
pub type ReadingSender = broadcast::Sender<ReadingEvent>;

/// Receiver for accepted-reading events.
pub type ReadingReceiver = broadcast::Receiver<ReadingEvent>;

/// Everything needed to build a pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum number of stored readings.
    pub capacity: usize,
    /// How far behind the newest reading history is kept.
    pub retention: Duration,
    pub thresholds: ThresholdConfig,
    pub aqi: AqiTables,
    pub trend: TrendConfig,
    pub validator: ValidatorConfig,
    /// Events buffered per subscriber before a slow one starts lagging.
    pub broadcast_buffer: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            retention: Period::LONGEST.duration(),
            thresholds: ThresholdConfig::default(),
            aqi: AqiTables::default(),
            trend: TrendConfig::default(),
            validator: ValidatorConfig::default(),
            broadcast_buffer: DEFAULT_BROADCAST_BUFFER,
        }
    }
}

/// Validates, stores and analyzes incoming readings.
#[derive(Debug)]
pub struct IngestionPipeline {
    store: HistoryStore,
    validator: ReadingValidator,
    analyzer: ThresholdAnalyzer,
    aqi: AqiCalculator,
    stats: StatsAggregator,
    events: ReadingSender,
}

impl IngestionPipeline {
    /// Build a pipeline, validating every configured table.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidConfig`] if the capacity, retention,
    /// thresholds or AQI tables are malformed.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let store = HistoryStore::new(config.capacity, config.retention)?;
        let analyzer = ThresholdAnalyzer::new(config.thresholds)?;
        let aqi = AqiCalculator::new(config.aqi)?;
        if config.broadcast_buffer == 0 {
            return Err(crate::Error::InvalidConfig(
                "broadcast buffer must be at least 1".to_string(),
            ));
        }
        let (events, _) = broadcast::channel(config.broadcast_buffer);

        Ok(Self {
            store,
            validator: ReadingValidator::new(config.validator),
            analyzer,
            aqi,
            stats: StatsAggregator::new(config.trend),
            events,
        })
    }

    /// Validate and store a submission.
    ///
    /// A missing timestamp is filled with `now`. Plausibility warnings are
    /// logged but do not reject the reading.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::Validation`] if a field is missing or out of domain,
    ///   or the timestamp is too far ahead of `now`.
    /// - [`crate::Error::OutOfOrder`] if the timestamp is not after the last
    ///   stored reading.
    ///
    /// In both cases nothing is stored and no event is published.
    pub fn submit(&self, input: &ReadingInput, now: OffsetDateTime) -> Result<ReadingEvent> {
        let validated = self.validator.validate(input, now).map_err(|e| {
            warn!("Rejected reading: {}", e);
            e
        })?;
        for warning in &validated.warnings {
            warn!("Suspicious reading at {}: {}", validated.reading.timestamp, warning);
        }
        self.submit_reading(validated.reading)
    }

    fn submit_reading(&self, reading: Reading) -> Result<ReadingEvent> {
        self.store.append(reading).map_err(|e| {
            warn!("Rejected reading: {}", e);
            e
        })?;

        let event = ReadingEvent {
            reading,
            analysis: self.analyzer.analyze(&reading),
            aqi: self.aqi.compute(&reading),
        };
        debug!(
            "Accepted reading at {}: status={}, aqi={}",
            reading.timestamp, event.analysis.status, event.aqi.value
        );

        // No receivers is fine.
        let _ = self.events.send(event.clone());
        Ok(event)
    }

    /// The newest reading with its analysis, or `None` if nothing is stored.
    pub fn current(&self) -> Option<Current> {
        self.store.latest().map(|reading| Current {
            analysis: self.analyzer.analyze(&reading),
            reading,
        })
    }

    /// Air quality index of the newest reading.
    pub fn aqi(&self) -> Option<AqiResult> {
        self.store.latest().map(|r| self.aqi.compute(&r))
    }

    /// The most recent `limit` readings, oldest first.
    pub fn history(&self, limit: usize) -> Vec<Reading> {
        self.store.query(limit)
    }

    /// Statistics over the readings within `period` of `now`.
    pub fn stats(&self, period: Period, now: OffsetDateTime) -> StatsReport {
        let window = self.store.query_window(period, now);
        self.stats.aggregate_all(&window)
    }

    /// Subscribe to accepted readings.
    ///
    /// Only readings accepted after the call are delivered.
    pub fn subscribe(&self) -> ReadingReceiver {
        self.events.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Number of stored readings.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether nothing has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Maximum number of stored readings.
    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    /// Read-only view of the stored history.
    pub fn snapshot(&self) -> Arc<HistorySnapshot> {
        self.store.snapshot()
    }

    pub fn calculator(&self) -> &AqiCalculator {
        &self.aqi
    }
}

impl Default for IngestionPipeline {
    fn default() -> Self {
        let (events, _) = broadcast::channel(DEFAULT_BROADCAST_BUFFER);
        Self {
            store: HistoryStore::default(),
            validator: ReadingValidator::default(),
            analyzer: ThresholdAnalyzer::default(),
            aqi: AqiCalculator::default(),
            stats: StatsAggregator::default(),
            events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use airwatch_types::{AqiCategory, Parameter, Stat, Status, Trend};
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2024-06-01 12:00 UTC);

    fn input(pm25: f64, pm10: f64, co2: f64) -> ReadingInput {
        ReadingInput {
            timestamp: None,
            temperature: Some(22.0),
            humidity: Some(50.0),
            co2: Some(co2),
            pm25: Some(pm25),
            pm10: Some(pm10),
            light: Some(1000.0),
        }
    }

    fn at(minutes: i64, input: ReadingInput) -> ReadingInput {
        ReadingInput {
            timestamp: Some(NOW + Duration::minutes(minutes)),
            ..input
        }
    }

    #[test]
    fn test_clean_air_is_safe_and_good() {
        let pipeline = IngestionPipeline::default();
        let event = pipeline.submit(&input(10.0, 20.0, 400.0), NOW).unwrap();

        assert_eq!(event.reading.timestamp, NOW);
        assert_eq!(event.analysis.status, Status::Safe);
        assert!(event.analysis.issues.is_empty());
        assert_eq!(event.aqi.category, AqiCategory::Good);
    }

    #[test]
    fn test_polluted_air_is_hazard() {
        let pipeline = IngestionPipeline::default();
        let event = pipeline.submit(&input(150.0, 60.0, 1100.0), NOW).unwrap();

        assert_eq!(event.analysis.status, Status::Hazard);
        for p in [Parameter::Pm25, Parameter::Pm10, Parameter::Co2] {
            assert!(event.analysis.has_issue(p), "missing issue for {p}");
        }
        assert_eq!(event.aqi.primary_pollutant, Parameter::Pm25);
    }

    #[test]
    fn test_current_and_aqi_empty() {
        let pipeline = IngestionPipeline::default();
        assert!(pipeline.current().is_none());
        assert!(pipeline.aqi().is_none());
        assert!(pipeline.history(10).is_empty());
    }

    #[test]
    fn test_current_tracks_latest() {
        let pipeline = IngestionPipeline::default();
        pipeline.submit(&at(0, input(10.0, 20.0, 400.0)), NOW).unwrap();
        pipeline.submit(&at(1, input(10.0, 20.0, 1200.0)), NOW).unwrap();

        let current = pipeline.current().unwrap();
        assert_eq!(current.reading.co2, 1200.0);
        assert_eq!(current.analysis.status, Status::Warning);
        assert_eq!(pipeline.history(10).len(), 2);
    }

    #[test]
    fn test_validation_error_stores_nothing() {
        let pipeline = IngestionPipeline::default();
        let bad = ReadingInput {
            co2: None,
            ..input(10.0, 20.0, 400.0)
        };
        let err = pipeline.submit(&bad, NOW).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(pipeline.is_empty());
    }

    #[test]
    fn test_out_of_order_stores_nothing() {
        let pipeline = IngestionPipeline::default();
        pipeline.submit(&at(5, input(10.0, 20.0, 400.0)), NOW).unwrap();
        let err = pipeline
            .submit(&at(0, input(10.0, 20.0, 900.0)), NOW)
            .unwrap_err();
        assert!(matches!(err, Error::OutOfOrder { .. }));
        assert_eq!(pipeline.history(10).len(), 1);
        assert_eq!(pipeline.current().unwrap().reading.co2, 400.0);
    }

    #[test]
    fn test_far_future_timestamp_leaves_history_intact() {
        let pipeline = IngestionPipeline::default();
        for minute in -10..0 {
            pipeline.submit(&at(minute, input(10.0, 20.0, 400.0)), NOW).unwrap();
        }

        let future = ReadingInput {
            timestamp: Some(datetime!(2099-01-01 00:00 UTC)),
            ..input(10.0, 20.0, 5000.0)
        };
        let err = pipeline.submit(&future, NOW).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(pipeline.len(), 10);

        // Server-stamped readings keep flowing.
        pipeline
            .submit(&input(10.0, 20.0, 400.0), NOW + Duration::minutes(1))
            .unwrap();
        assert_eq!(pipeline.len(), 11);
        assert_eq!(pipeline.stats(Period::OneHour, NOW).co2.max, 400.0);
    }

    #[test]
    fn test_stats_ignore_readings_after_now() {
        let pipeline = IngestionPipeline::default();
        pipeline.submit(&at(0, input(10.0, 20.0, 400.0)), NOW).unwrap();
        pipeline.submit(&at(3, input(10.0, 20.0, 900.0)), NOW).unwrap();

        let report = pipeline.stats(Period::OneHour, NOW);
        assert_eq!(report.co2.max, 400.0);
        assert_eq!(pipeline.snapshot().len(), 2);
    }

    #[test]
    fn test_stats_empty_window() {
        let pipeline = IngestionPipeline::default();
        let report = pipeline.stats(Period::OneHour, NOW);
        for p in Parameter::MONITORED {
            assert_eq!(report.get(p), Some(&Stat::default()));
        }
    }

    #[test]
    fn test_stats_respects_period() {
        let pipeline = IngestionPipeline::default();
        pipeline.submit(&at(-120, input(10.0, 20.0, 2000.0)), NOW).unwrap();
        pipeline.submit(&at(-30, input(10.0, 20.0, 400.0)), NOW).unwrap();
        pipeline.submit(&at(0, input(10.0, 20.0, 600.0)), NOW).unwrap();

        let hour = pipeline.stats(Period::OneHour, NOW);
        assert_eq!(hour.co2.min, 400.0);
        assert_eq!(hour.co2.max, 600.0);
        assert_eq!(hour.co2.trend, Trend::Increasing);

        let day = pipeline.stats(Period::Day, NOW);
        assert_eq!(day.co2.max, 2000.0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PipelineConfig {
            capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            IngestionPipeline::new(config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_event_serializes_with_data_key() {
        let pipeline = IngestionPipeline::default();
        let event = pipeline.submit(&input(10.0, 20.0, 400.0), NOW).unwrap();
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["data"]["co2"], 400.0);
        assert_eq!(json["analysis"]["status"], "safe");
        assert_eq!(json["aqi"]["category"], "Good");
        assert_eq!(json["aqi"]["primaryPollutant"], "pm25");
    }

    #[tokio::test]
    async fn test_subscribers_receive_accepted_readings() {
        let pipeline = IngestionPipeline::default();
        let mut rx = pipeline.subscribe();
        assert_eq!(pipeline.subscriber_count(), 1);

        let bad = ReadingInput {
            light: None,
            ..input(10.0, 20.0, 400.0)
        };
        assert!(pipeline.submit(&bad, NOW).is_err());
        pipeline.submit(&input(10.0, 20.0, 777.0), NOW).unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.reading.co2, 777.0);
        assert!(rx.try_recv().is_err());
    }
}
