//! Validation of submitted sensor readings.
//!
//! Submissions arrive as [`ReadingInput`] with every field optional. The
//! validator turns them into a [`Reading`] or rejects them outright; nothing
//! is stored for a rejected submission.
//!
//! Hard failures ([`ValidationError`]) are missing fields, non-finite values,
//! negative values where the parameter cannot be negative, and timestamps too
//! far ahead of the receive time. Implausible but
//! representable values produce [`ValidationWarning`]s instead and are
//! accepted.
//!
//! # Example
//!
//! ```
//! use airwatch_core::ReadingValidator;
//! use airwatch_types::ReadingInput;
//! use time::OffsetDateTime;
//!
//! let validator = ReadingValidator::default();
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
//! let validated = validator.validate(&input, OffsetDateTime::now_utc()).unwrap();
//! assert!(!validated.has_warnings());
//! ```

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use airwatch_types::{Parameter, Reading, ReadingInput};

/// Reasons a submitted reading is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// A required field was absent.
    #[error("missing field '{0}'")]
    MissingField(Parameter),
    /// A field was NaN or infinite.
    #[error("{parameter} must be a finite number")]
    NonFinite { parameter: Parameter, value: f64 },
    /// A field that cannot be negative was below zero.
    #[error("{parameter} cannot be negative (got {value})")]
    Negative { parameter: Parameter, value: f64 },
    /// The submitted timestamp is further ahead of the receive time than
    /// the configured clock skew allows.
    #[error("timestamp {timestamp} is too far ahead of server time {received_at}")]
    TimestampInFuture {
        timestamp: OffsetDateTime,
        received_at: OffsetDateTime,
    },
}

/// Plausibility warnings for accepted readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ValidationWarning {
    /// Relative humidity above 100%.
    HumidityAboveSaturation { value: f64 },
    /// Temperature outside the sensor's rated range.
    TemperatureOutOfRange { value: f64, min: f64, max: f64 },
    /// CO2 and both particulate channels read zero, which usually means a
    /// disconnected sensor rather than clean air.
    AllPollutantsZero,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationWarning::HumidityAboveSaturation { value } => {
                write!(f, "Humidity {}% exceeds 100%", value)
            }
            ValidationWarning::TemperatureOutOfRange { value, min, max } => {
                write!(
                    f,
                    "Temperature {}°C is outside sensor range {}..{}°C",
                    value, min, max
                )
            }
            ValidationWarning::AllPollutantsZero => {
                write!(f, "CO2, PM2.5 and PM10 are all zero - possible sensor fault")
            }
        }
    }
}

/// Configuration for plausibility checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Lowest temperature the sensor is rated for (°C).
    pub temperature_min: f64,
    /// Highest temperature the sensor is rated for (°C).
    pub temperature_max: f64,
    /// Warn when every pollutant channel reads zero.
    pub warn_on_zero_pollutants: bool,
    /// How far ahead of the receive time a submitted timestamp may be (seconds).
    pub max_future_skew_secs: u64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            temperature_min: -40.0,
            temperature_max: 85.0,
            warn_on_zero_pollutants: true,
            max_future_skew_secs: 300,
        }
    }
}

/// A reading that passed validation, with any plausibility warnings.
#[derive(Debug, Clone)]
pub struct Validated {
    pub reading: Reading,
    pub warnings: Vec<ValidationWarning>,
}

impl Validated {
    /// Check if there are any warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Validator for submitted readings.
#[derive(Debug, Clone, Default)]
pub struct ReadingValidator {
    config: ValidatorConfig,
}

impl ReadingValidator {
    /// Create a validator with the given configuration.
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Largest accepted lead of a submitted timestamp over the receive time.
    pub fn max_future_skew(&self) -> Duration {
        Duration::seconds(i64::try_from(self.config.max_future_skew_secs).unwrap_or(i64::MAX))
    }

    /// Validate a submission.
    ///
    /// Fields are checked in wire order and the first failure is returned.
    /// A missing timestamp is filled with `received_at`; a supplied one may
    /// lead it by at most [`Self::max_future_skew`].
    pub fn validate(
        &self,
        input: &ReadingInput,
        received_at: OffsetDateTime,
    ) -> Result<Validated, ValidationError> {
        let mut values = [0.0; 6];
        for (slot, parameter) in values.iter_mut().zip(Parameter::ALL) {
            *slot = check_field(parameter, input.value(parameter))?;
        }
        let [temperature, humidity, co2, pm25, pm10, light] = values;

        let timestamp = match input.timestamp {
            Some(timestamp) if timestamp - received_at > self.max_future_skew() => {
                return Err(ValidationError::TimestampInFuture {
                    timestamp,
                    received_at,
                });
            }
            Some(timestamp) => timestamp,
            None => received_at,
        };

        let reading = Reading {
            timestamp,
            temperature,
            humidity,
            co2,
            pm25,
            pm10,
            light,
        };

        let warnings = self.plausibility_warnings(&reading);
        Ok(Validated { reading, warnings })
    }

    fn plausibility_warnings(&self, reading: &Reading) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if reading.humidity > 100.0 {
            warnings.push(ValidationWarning::HumidityAboveSaturation {
                value: reading.humidity,
            });
        }

        if reading.temperature < self.config.temperature_min
            || reading.temperature > self.config.temperature_max
        {
            warnings.push(ValidationWarning::TemperatureOutOfRange {
                value: reading.temperature,
                min: self.config.temperature_min,
                max: self.config.temperature_max,
            });
        }

        if self.config.warn_on_zero_pollutants
            && reading.co2 == 0.0
            && reading.pm25 == 0.0
            && reading.pm10 == 0.0
        {
            warnings.push(ValidationWarning::AllPollutantsZero);
        }

        warnings
    }
}

fn check_field(parameter: Parameter, value: Option<f64>) -> Result<f64, ValidationError> {
    let value = value.ok_or(ValidationError::MissingField(parameter))?;
    if !value.is_finite() {
        return Err(ValidationError::NonFinite { parameter, value });
    }
    if value < 0.0 && !parameter.allows_negative() {
        return Err(ValidationError::Negative { parameter, value });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2024-01-01 12:00 UTC);

    fn complete_input() -> ReadingInput {
        ReadingInput {
            timestamp: None,
            temperature: Some(22.0),
            humidity: Some(50.0),
            co2: Some(400.0),
            pm25: Some(10.0),
            pm10: Some(20.0),
            light: Some(1000.0),
        }
    }

    #[test]
    fn test_valid_input() {
        let validated = ReadingValidator::default()
            .validate(&complete_input(), NOW)
            .unwrap();
        assert_eq!(validated.reading.timestamp, NOW);
        assert_eq!(validated.reading.co2, 400.0);
        assert!(!validated.has_warnings());
    }

    #[test]
    fn test_explicit_timestamp_kept() {
        let ts = datetime!(2024-01-01 11:59 UTC);
        let input = ReadingInput {
            timestamp: Some(ts),
            ..complete_input()
        };
        let validated = ReadingValidator::default().validate(&input, NOW).unwrap();
        assert_eq!(validated.reading.timestamp, ts);
    }

    #[test]
    fn test_future_timestamp_rejected() {
        let input = ReadingInput {
            timestamp: Some(datetime!(2099-01-01 00:00 UTC)),
            ..complete_input()
        };
        let err = ReadingValidator::default().validate(&input, NOW).unwrap_err();
        assert!(matches!(err, ValidationError::TimestampInFuture { .. }));
        assert!(err.to_string().contains("2099"));
    }

    #[test]
    fn test_small_clock_skew_accepted() {
        let validator = ReadingValidator::default();
        assert_eq!(validator.max_future_skew(), Duration::minutes(5));

        let at_limit = ReadingInput {
            timestamp: Some(NOW + Duration::minutes(5)),
            ..complete_input()
        };
        assert!(validator.validate(&at_limit, NOW).is_ok());

        let past_limit = ReadingInput {
            timestamp: Some(NOW + Duration::minutes(5) + Duration::seconds(1)),
            ..complete_input()
        };
        assert!(validator.validate(&past_limit, NOW).is_err());
    }

    #[test]
    fn test_missing_field() {
        let input = ReadingInput {
            pm10: None,
            ..complete_input()
        };
        let err = ReadingValidator::default().validate(&input, NOW).unwrap_err();
        assert_eq!(err, ValidationError::MissingField(Parameter::Pm10));
        assert_eq!(err.to_string(), "missing field 'pm10'");
    }

    #[test]
    fn test_non_finite_rejected() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let input = ReadingInput {
                humidity: Some(bad),
                ..complete_input()
            };
            let err = ReadingValidator::default().validate(&input, NOW).unwrap_err();
            assert!(matches!(
                err,
                ValidationError::NonFinite {
                    parameter: Parameter::Humidity,
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_negative_rejected_except_temperature() {
        let input = ReadingInput {
            pm25: Some(-1.0),
            ..complete_input()
        };
        let err = ReadingValidator::default().validate(&input, NOW).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Negative {
                parameter: Parameter::Pm25,
                value: -1.0
            }
        );

        let input = ReadingInput {
            temperature: Some(-5.0),
            ..complete_input()
        };
        assert!(ReadingValidator::default().validate(&input, NOW).is_ok());
    }

    #[test]
    fn test_zero_is_valid() {
        let input = ReadingInput {
            light: Some(0.0),
            pm25: Some(0.0),
            ..complete_input()
        };
        let validated = ReadingValidator::default().validate(&input, NOW).unwrap();
        assert_eq!(validated.reading.light, 0.0);
    }

    #[test]
    fn test_first_failure_in_wire_order() {
        let input = ReadingInput {
            temperature: None,
            co2: Some(f64::NAN),
            ..complete_input()
        };
        let err = ReadingValidator::default().validate(&input, NOW).unwrap_err();
        assert_eq!(err, ValidationError::MissingField(Parameter::Temperature));
    }

    #[test]
    fn test_warnings() {
        let input = ReadingInput {
            humidity: Some(104.0),
            temperature: Some(90.0),
            co2: Some(0.0),
            pm25: Some(0.0),
            pm10: Some(0.0),
            ..complete_input()
        };
        let validated = ReadingValidator::default().validate(&input, NOW).unwrap();
        assert_eq!(validated.warnings.len(), 3);
        assert!(validated
            .warnings
            .contains(&ValidationWarning::AllPollutantsZero));
        assert!(validated.warnings[0].to_string().contains("104"));
    }

    #[test]
    fn test_zero_pollutant_warning_disabled() {
        let validator = ReadingValidator::new(ValidatorConfig {
            warn_on_zero_pollutants: false,
            ..Default::default()
        });
        let input = ReadingInput {
            co2: Some(0.0),
            pm25: Some(0.0),
            pm10: Some(0.0),
            ..complete_input()
        };
        assert!(!validator.validate(&input, NOW).unwrap().has_warnings());
    }
}
