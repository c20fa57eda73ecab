//! Rolling statistics and trend detection over a history window.
//!
//! Trend compares the average of the newer half of the window against the
//! older half. When the window has an odd number of readings the extra one
//! belongs to the older half. A change smaller than the parameter's noise
//! floor (epsilon) is reported as stable so that sensor jitter does not show
//! up as a trend.

use serde::{Deserialize, Serialize};

use airwatch_types::{Parameter, Reading, Stat, StatsReport, Trend};

/// Per-parameter noise floors for trend detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Degrees Celsius.
    pub temperature: f64,
    /// Percentage points of relative humidity.
    pub humidity: f64,
    /// ppm.
    pub co2: f64,
    /// µg/m³.
    pub pm25: f64,
    /// µg/m³.
    pub pm10: f64,
    /// Raw analog units.
    pub light: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            humidity: 1.0,
            co2: 20.0,
            pm25: 1.0,
            pm10: 1.0,
            light: 10.0,
        }
    }
}

impl TrendConfig {
    /// Noise floor for a parameter.
    pub fn epsilon(&self, parameter: Parameter) -> f64 {
        match parameter {
            Parameter::Temperature => self.temperature,
            Parameter::Humidity => self.humidity,
            Parameter::Co2 => self.co2,
            Parameter::Pm25 => self.pm25,
            Parameter::Pm10 => self.pm10,
            Parameter::Light => self.light,
        }
    }
}

/// Computes [`Stat`]s over chronologically ordered readings.
#[derive(Debug, Clone, Default)]
pub struct StatsAggregator {
    trend: TrendConfig,
}

impl StatsAggregator {
    pub fn new(trend: TrendConfig) -> Self {
        Self { trend }
    }

    pub fn trend_config(&self) -> &TrendConfig {
        &self.trend
    }

    /// Statistics of one parameter over `readings`, which must be ordered
    /// oldest first.
    ///
    /// An empty window yields all zeros and a stable trend.
    pub fn aggregate(&self, readings: &[Reading], parameter: Parameter) -> Stat {
        if readings.is_empty() {
            return Stat::default();
        }

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for r in readings {
            let v = r.value(parameter);
            min = min.min(v);
            max = max.max(v);
            sum += v;
        }

        Stat {
            min,
            max,
            average: sum / readings.len() as f64,
            trend: self.trend(readings, parameter),
        }
    }

    /// Statistics for every monitored parameter.
    pub fn aggregate_all(&self, readings: &[Reading]) -> StatsReport {
        let mut report = StatsReport::default();
        for parameter in Parameter::MONITORED {
            if let Some(stat) = report.get_mut(parameter) {
                *stat = self.aggregate(readings, parameter);
            }
        }
        report
    }

    /// Direction of change between the older and newer halves of the window.
    pub fn trend(&self, readings: &[Reading], parameter: Parameter) -> Trend {
        if readings.len() < 2 {
            return Trend::Stable;
        }

        let split = readings.len().div_ceil(2);
        let (older, newer) = readings.split_at(split);
        let delta = mean(newer, parameter) - mean(older, parameter);
        let epsilon = self.trend.epsilon(parameter);

        if delta > epsilon {
            Trend::Increasing
        } else if delta < -epsilon {
            Trend::Decreasing
        } else {
            Trend::Stable
        }
    }
}

fn mean(readings: &[Reading], parameter: Parameter) -> f64 {
    let sum: f64 = readings.iter().map(|r| r.value(parameter)).sum();
    sum / readings.len() as f64
}


/// Property-based tests for trend invariants.
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use time::Duration;
    use time::macros::datetime;

    fn series(values: &[f64]) -> Vec<Reading> {
        let start = datetime!(2024-01-01 00:00 UTC);
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Reading {
                timestamp: start + Duration::minutes(i as i64),
                temperature: v,
                humidity: v,
                co2: v,
                pm25: v,
                pm10: v,
                light: v,
            })
            .collect()
    }

    proptest! {
        /// A constant window is always stable.
        #[test]
        fn constant_window_stable(value in -40.0f64..5000.0, len in 1usize..50) {
            let window = series(&vec![value; len]);
            let agg = StatsAggregator::default();
            for p in Parameter::MONITORED {
                prop_assert_eq!(agg.trend(&window, p), Trend::Stable);
            }
        }

        /// A strictly increasing window whose half-averages differ by more
        /// than every epsilon is increasing, and min <= average <= max holds.
        #[test]
        fn increasing_window(start in 0.0f64..100.0, step in 50.0f64..100.0, len in 2usize..40) {
            let values: Vec<f64> = (0..len).map(|i| start + step * i as f64).collect();
            let window = series(&values);
            let agg = StatsAggregator::default();
            for p in Parameter::MONITORED {
                let stat = agg.aggregate(&window, p);
                prop_assert_eq!(stat.trend, Trend::Increasing);
                prop_assert!(stat.min <= stat.average && stat.average <= stat.max);
            }
        }
    }
}
