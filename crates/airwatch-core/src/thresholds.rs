//! Safe-range thresholds and safety classification.
//!
//! This module classifies a single reading against a table of safe ranges,
//! one per monitored parameter, and derives an overall [`Status`].
//!
//! A value exactly on a boundary is safe. A parameter outside its range
//! raises an [`Issue`] carrying the violated boundary. The reading is a
//! hazard when any issue overshoots by more than the hazard ratio: relative
//! to the limit for upper-bounded rules, relative to the span for ranged
//! rules.
//!
//! # Example
//!
//! ```
//! use airwatch_core::ThresholdAnalyzer;
//! use airwatch_types::{Reading, Status};
//! use time::OffsetDateTime;
//!
//! let analyzer = ThresholdAnalyzer::default();
//!
//! let reading = Reading {
//!     timestamp: OffsetDateTime::now_utc(),
//!     temperature: 22.0,
//!     humidity: 50.0,
//!     co2: 1200.0,
//!     pm25: 10.0,
//!     pm10: 20.0,
//!     light: 1000.0,
//! };
//!
//! let result = analyzer.analyze(&reading);
//! assert_eq!(result.status, Status::Warning);
//! assert_eq!(result.issues[0].threshold, 1000.0);
//! ```

use serde::{Deserialize, Serialize};

use airwatch_types::{AnalysisResult, Issue, Parameter, Reading, Status};

use crate::error::{Error, Result};

/// Safe range rule for one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SafeRange {
    /// Safe within `[min, max]`.
    Between { min: f64, max: f64 },
    /// Safe up to and including `max`.
    AtMost { max: f64 },
}

/// A breached range: the boundary crossed and how severe the breach is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Violation {
    pub threshold: f64,
    pub severity: Status,
}

impl SafeRange {
    /// Check a value against this range.
    ///
    /// Returns `None` when the value is safe.
    pub fn check(&self, value: f64, hazard_ratio: f64) -> Option<Violation> {
        let (threshold, overshoot, allowance) = match *self {
            SafeRange::Between { min, max } => {
                let span = max - min;
                if value < min {
                    (min, min - value, span * hazard_ratio)
                } else if value > max {
                    (max, value - max, span * hazard_ratio)
                } else {
                    return None;
                }
            }
            SafeRange::AtMost { max } => {
                if value > max {
                    (max, value - max, max * hazard_ratio)
                } else {
                    return None;
                }
            }
        };

        let severity = if overshoot > allowance {
            Status::Hazard
        } else {
            Status::Warning
        };
        Some(Violation {
            threshold,
            severity,
        })
    }

    fn validate(&self, parameter: Parameter) -> Result<()> {
        let ok = match *self {
            SafeRange::Between { min, max } => min.is_finite() && max.is_finite() && min < max,
            SafeRange::AtMost { max } => max.is_finite() && max >= 0.0,
        };
        if ok {
            Ok(())
        } else {
            Err(Error::InvalidConfig(format!(
                "invalid safe range for {}: {:?}",
                parameter, self
            )))
        }
    }
}

/// Configuration for safe ranges and the hazard multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub temperature: SafeRange,
    pub humidity: SafeRange,
    pub co2: SafeRange,
    pub pm25: SafeRange,
    pub pm10: SafeRange,
    /// Overshoot beyond which a breach counts as a hazard (0.5 = 50%).
    pub hazard_ratio: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            temperature: SafeRange::Between {
                min: 10.0,
                max: 35.0,
            },
            humidity: SafeRange::Between {
                min: 30.0,
                max: 70.0,
            },
            co2: SafeRange::AtMost { max: 1000.0 },
            pm25: SafeRange::AtMost { max: 35.0 },
            pm10: SafeRange::AtMost { max: 50.0 },
            hazard_ratio: 0.5,
        }
    }
}

impl ThresholdConfig {
    /// Create strict thresholds suitable for sensitive occupants.
    pub fn strict() -> Self {
        Self {
            temperature: SafeRange::Between {
                min: 18.0,
                max: 27.0,
            },
            humidity: SafeRange::Between {
                min: 40.0,
                max: 60.0,
            },
            co2: SafeRange::AtMost { max: 800.0 },
            pm25: SafeRange::AtMost { max: 15.0 },
            pm10: SafeRange::AtMost { max: 45.0 },
            hazard_ratio: 0.5,
        }
    }

    /// Create relaxed thresholds for workshops and industrial spaces.
    pub fn relaxed() -> Self {
        Self {
            temperature: SafeRange::Between {
                min: 5.0,
                max: 40.0,
            },
            humidity: SafeRange::Between {
                min: 20.0,
                max: 80.0,
            },
            co2: SafeRange::AtMost { max: 1500.0 },
            pm25: SafeRange::AtMost { max: 55.0 },
            pm10: SafeRange::AtMost { max: 150.0 },
            hazard_ratio: 0.5,
        }
    }

    /// Get the safe range for a parameter.
    ///
    /// Returns `None` for [`Parameter::Light`], which has no safe range.
    pub fn range(&self, parameter: Parameter) -> Option<SafeRange> {
        match parameter {
            Parameter::Temperature => Some(self.temperature),
            Parameter::Humidity => Some(self.humidity),
            Parameter::Co2 => Some(self.co2),
            Parameter::Pm25 => Some(self.pm25),
            Parameter::Pm10 => Some(self.pm10),
            Parameter::Light => None,
        }
    }

    /// Validate every range and the hazard ratio.
    pub fn validate(&self) -> Result<()> {
        for parameter in Parameter::MONITORED {
            if let Some(range) = self.range(parameter) {
                range.validate(parameter)?;
            }
        }
        if !self.hazard_ratio.is_finite() || self.hazard_ratio < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "hazard_ratio must be a non-negative number (got {})",
                self.hazard_ratio
            )));
        }
        Ok(())
    }
}

/// Threshold analyzer for sensor readings.
#[derive(Debug, Clone, Default)]
pub struct ThresholdAnalyzer {
    config: ThresholdConfig,
}

impl ThresholdAnalyzer {
    /// Create a new analyzer with the given configuration.
    pub fn new(config: ThresholdConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Create an analyzer with strict thresholds.
    pub fn strict() -> Self {
        Self {
            config: ThresholdConfig::strict(),
        }
    }

    /// Create an analyzer with relaxed thresholds.
    pub fn relaxed() -> Self {
        Self {
            config: ThresholdConfig::relaxed(),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }

    /// Classify a reading.
    ///
    /// Issues are reported in parameter order (temperature, humidity, co2,
    /// pm25, pm10). The status is the most severe violation, or
    /// [`Status::Safe`] when there is none.
    pub fn analyze(&self, reading: &Reading) -> AnalysisResult {
        let mut status = Status::Safe;
        let mut issues = Vec::new();

        for parameter in Parameter::MONITORED {
            let Some(range) = self.config.range(parameter) else {
                continue;
            };
            let value = reading.value(parameter);
            if let Some(violation) = range.check(value, self.config.hazard_ratio) {
                status = status.max(violation.severity);
                issues.push(Issue {
                    parameter,
                    value,
                    threshold: violation.threshold,
                });
            }
        }

        AnalysisResult { status, issues }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn reading(temperature: f64, humidity: f64, co2: f64, pm25: f64, pm10: f64) -> Reading {
        Reading {
            timestamp: datetime!(2024-01-01 12:00 UTC),
            temperature,
            humidity,
            co2,
            pm25,
            pm10,
            light: 0.0,
        }
    }

    #[test]
    fn test_all_safe() {
        let result =
            ThresholdAnalyzer::default().analyze(&reading(22.0, 50.0, 400.0, 10.0, 20.0));
        assert_eq!(result.status, Status::Safe);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_boundary_values_are_safe() {
        let t = ThresholdAnalyzer::default();
        assert!(t.analyze(&reading(10.0, 30.0, 1000.0, 35.0, 50.0)).is_safe());
        assert!(t.analyze(&reading(35.0, 70.0, 1000.0, 35.0, 50.0)).is_safe());
    }

    #[test]
    fn test_just_over_boundary_is_warning() {
        let result =
            ThresholdAnalyzer::default().analyze(&reading(22.0, 50.0, 1000.5, 10.0, 20.0));
        assert_eq!(result.status, Status::Warning);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].parameter, Parameter::Co2);
        assert_eq!(result.issues[0].value, 1000.5);
        assert_eq!(result.issues[0].threshold, 1000.0);
    }

    #[test]
    fn test_upper_bound_hazard_ratio() {
        let t = ThresholdAnalyzer::default();
        // Exactly 150% of the limit is still a warning.
        assert_eq!(
            t.analyze(&reading(22.0, 50.0, 400.0, 52.5, 20.0)).status,
            Status::Warning
        );
        assert_eq!(
            t.analyze(&reading(22.0, 50.0, 400.0, 52.6, 20.0)).status,
            Status::Hazard
        );
        assert_eq!(
            t.analyze(&reading(22.0, 50.0, 1501.0, 10.0, 20.0)).status,
            Status::Hazard
        );
    }

    #[test]
    fn test_ranged_hazard_uses_span() {
        let t = ThresholdAnalyzer::default();
        // Temperature span is 25, so hazard beyond 12.5 outside the range.
        let warm = t.analyze(&reading(47.0, 50.0, 400.0, 10.0, 20.0));
        assert_eq!(warm.status, Status::Warning);
        assert_eq!(warm.issues[0].threshold, 35.0);

        let hot = t.analyze(&reading(48.0, 50.0, 400.0, 10.0, 20.0));
        assert_eq!(hot.status, Status::Hazard);

        let cold = t.analyze(&reading(-3.0, 50.0, 400.0, 10.0, 20.0));
        assert_eq!(cold.status, Status::Hazard);
        assert_eq!(cold.issues[0].threshold, 10.0);

        // Humidity span is 40, so hazard below 10%.
        let dry = t.analyze(&reading(22.0, 12.0, 400.0, 10.0, 20.0));
        assert_eq!(dry.status, Status::Warning);
        assert_eq!(dry.issues[0].threshold, 30.0);
        assert_eq!(
            t.analyze(&reading(22.0, 9.0, 400.0, 10.0, 20.0)).status,
            Status::Hazard
        );
    }

    #[test]
    fn test_mixed_issues_ordering() {
        let result =
            ThresholdAnalyzer::default().analyze(&reading(22.0, 50.0, 1100.0, 150.0, 60.0));
        assert_eq!(result.status, Status::Hazard);
        let params: Vec<_> = result.issues.iter().map(|i| i.parameter).collect();
        assert_eq!(params, vec![Parameter::Co2, Parameter::Pm25, Parameter::Pm10]);
    }

    #[test]
    fn test_light_never_raises_issue() {
        let mut r = reading(22.0, 50.0, 400.0, 10.0, 20.0);
        r.light = 1.0e9;
        assert!(ThresholdAnalyzer::default().analyze(&r).is_safe());
    }

    #[test]
    fn test_strict_and_relaxed_presets() {
        let r = reading(22.0, 50.0, 900.0, 20.0, 20.0);
        assert_eq!(ThresholdAnalyzer::strict().analyze(&r).status, Status::Warning);
        assert!(ThresholdAnalyzer::default().analyze(&r).is_safe());
        assert!(ThresholdAnalyzer::relaxed().analyze(&r).is_safe());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ThresholdConfig {
            temperature: SafeRange::Between {
                min: 30.0,
                max: 10.0,
            },
            ..Default::default()
        };
        assert!(matches!(
            ThresholdAnalyzer::new(config),
            Err(Error::InvalidConfig(_))
        ));

        let config = ThresholdConfig {
            hazard_ratio: f64::NAN,
            ..Default::default()
        };
        assert!(ThresholdAnalyzer::new(config).is_err());
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let toml_str = r#"
            hazard_ratio = 0.25

            [co2]
            kind = "at_most"
            max = 800.0

            [temperature]
            kind = "between"
            min = 15.0
            max = 30.0
        "#;
        let config: ThresholdConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.co2, SafeRange::AtMost { max: 800.0 });
        assert_eq!(
            config.temperature,
            SafeRange::Between {
                min: 15.0,
                max: 30.0
            }
        );
        // Unspecified ranges keep their defaults.
        assert_eq!(config.pm10, ThresholdConfig::default().pm10);
        assert_eq!(config.hazard_ratio, 0.25);
    }
}
