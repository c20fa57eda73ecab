//! Core types for environmental sensor data and derived analytics.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::error::ParseError;

/// A sensor field carried by every [`Reading`].
///
/// Serializes as the lowercase field name (`"pm25"`, `"co2"`, ...), which is
/// also how the dashboard names parameters in `issues` and `primaryPollutant`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Parameter {
    /// Air temperature in degrees Celsius.
    Temperature,
    /// Relative humidity percentage.
    Humidity,
    /// CO2 concentration in ppm.
    Co2,
    /// Fine particulate matter (PM2.5) in µg/m³.
    Pm25,
    /// Coarse particulate matter (PM10) in µg/m³.
    Pm10,
    /// Ambient light in raw analog units.
    Light,
}

impl Parameter {
    /// Every field of a reading, in wire order.
    pub const ALL: [Parameter; 6] = [
        Parameter::Temperature,
        Parameter::Humidity,
        Parameter::Co2,
        Parameter::Pm25,
        Parameter::Pm10,
        Parameter::Light,
    ];

    /// The parameters that carry safe ranges and rolling statistics.
    pub const MONITORED: [Parameter; 5] = [
        Parameter::Temperature,
        Parameter::Humidity,
        Parameter::Co2,
        Parameter::Pm25,
        Parameter::Pm10,
    ];

    /// Wire name of the parameter.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Parameter::Temperature => "temperature",
            Parameter::Humidity => "humidity",
            Parameter::Co2 => "co2",
            Parameter::Pm25 => "pm25",
            Parameter::Pm10 => "pm10",
            Parameter::Light => "light",
        }
    }

    /// Display unit of the parameter.
    #[must_use]
    pub fn unit(&self) -> &'static str {
        match self {
            Parameter::Temperature => "°C",
            Parameter::Humidity => "%",
            Parameter::Co2 => "ppm",
            Parameter::Pm25 | Parameter::Pm10 => "µg/m³",
            Parameter::Light => "",
        }
    }

    /// Whether a negative value is physically meaningful for this parameter.
    ///
    /// Only temperature can legitimately drop below zero.
    #[must_use]
    pub fn allows_negative(&self) -> bool {
        matches!(self, Parameter::Temperature)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Parameter {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Parameter::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseError::UnknownParameter(s.to_string()))
    }
}

/// One accepted sensor sample.
///
/// Readings are immutable once stored. Timestamps are unique and strictly
/// increasing within a history.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reading {
    /// When the sample was taken.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
    /// Temperature in degrees Celsius.
    pub temperature: f64,
    /// Relative humidity percentage.
    pub humidity: f64,
    /// CO2 concentration in ppm.
    pub co2: f64,
    /// PM2.5 concentration in µg/m³.
    pub pm25: f64,
    /// PM10 concentration in µg/m³.
    pub pm10: f64,
    /// Ambient light in raw analog units.
    pub light: f64,
}

impl Reading {
    /// Get the value of a single parameter.
    #[must_use]
    pub fn value(&self, parameter: Parameter) -> f64 {
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

/// A reading as submitted by a device, before validation.
///
/// Every field is optional on the wire so that a missing field can be
/// reported precisely instead of failing deserialization wholesale. The
/// timestamp defaults to the time of acceptance when absent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReadingInput {
    #[cfg_attr(
        feature = "serde",
        serde(with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")
    )]
    pub timestamp: Option<OffsetDateTime>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub co2: Option<f64>,
    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
    pub light: Option<f64>,
}

impl ReadingInput {
    /// Get the submitted value of a single parameter, if present.
    #[must_use]
    pub fn value(&self, parameter: Parameter) -> Option<f64> {
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

impl From<Reading> for ReadingInput {
    fn from(reading: Reading) -> Self {
        Self {
            timestamp: Some(reading.timestamp),
            temperature: Some(reading.temperature),
            humidity: Some(reading.humidity),
            co2: Some(reading.co2),
            pm25: Some(reading.pm25),
            pm10: Some(reading.pm10),
            light: Some(reading.light),
        }
    }
}

/// Safety classification of a reading.
///
/// # Ordering
///
/// Values are ordered by severity: `Safe < Warning < Hazard`, so the overall
/// status of several findings is simply their maximum.
///
/// ```
/// use airwatch_types::Status;
///
/// assert!(Status::Hazard > Status::Warning);
/// assert_eq!(format!("{}", Status::Warning), "warning");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Status {
    /// Every parameter is inside its safe range.
    #[default]
    Safe,
    /// At least one parameter is outside its safe range.
    Warning,
    /// At least one parameter overshoots its safe range by more than the hazard ratio.
    Hazard,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Safe => write!(f, "safe"),
            Status::Warning => write!(f, "warning"),
            Status::Hazard => write!(f, "hazard"),
        }
    }
}

/// One parameter that breached its safe range.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Issue {
    /// The offending parameter.
    pub parameter: Parameter,
    /// The measured value.
    pub value: f64,
    /// The boundary that was violated.
    pub threshold: f64,
}

/// Safety analysis of a single reading.
///
/// `issues` is empty if and only if `status` is [`Status::Safe`].
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnalysisResult {
    pub status: Status,
    pub issues: Vec<Issue>,
}

impl AnalysisResult {
    /// A result with no issues.
    #[must_use]
    pub fn safe() -> Self {
        Self::default()
    }

    /// Whether the reading is inside every safe range.
    #[must_use]
    pub fn is_safe(&self) -> bool {
        self.status == Status::Safe
    }

    /// Whether an issue was raised for the given parameter.
    #[must_use]
    pub fn has_issue(&self, parameter: Parameter) -> bool {
        self.issues.iter().any(|i| i.parameter == parameter)
    }
}

/// Air quality category for an AQI value.
///
/// Serializes as the human-readable label the dashboard shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AqiCategory {
    Good,
    Moderate,
    #[cfg_attr(feature = "serde", serde(rename = "Unhealthy for Sensitive Groups"))]
    UnhealthyForSensitiveGroups,
    Unhealthy,
    #[cfg_attr(feature = "serde", serde(rename = "Very Unhealthy"))]
    VeryUnhealthy,
    Hazardous,
}

impl fmt::Display for AqiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AqiCategory::Good => write!(f, "Good"),
            AqiCategory::Moderate => write!(f, "Moderate"),
            AqiCategory::UnhealthyForSensitiveGroups => {
                write!(f, "Unhealthy for Sensitive Groups")
            }
            AqiCategory::Unhealthy => write!(f, "Unhealthy"),
            AqiCategory::VeryUnhealthy => write!(f, "Very Unhealthy"),
            AqiCategory::Hazardous => write!(f, "Hazardous"),
        }
    }
}

/// Maximum value of the air quality index.
pub const AQI_MAX: u16 = 500;

/// Air quality index computed from a reading's pollutant concentrations.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct AqiResult {
    /// Overall index in `0..=500`: the maximum pollutant sub-index.
    pub value: u16,
    pub category: AqiCategory,
    /// Display color as a hex string (e.g. `#00e400`).
    pub color: String,
    /// The pollutant whose sub-index determines `value`.
    pub primary_pollutant: Parameter,
}

/// Direction of change across a statistics window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Trend {
    Increasing,
    Decreasing,
    #[default]
    Stable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Increasing => write!(f, "increasing"),
            Trend::Decreasing => write!(f, "decreasing"),
            Trend::Stable => write!(f, "stable"),
        }
    }
}

/// Summary statistics of one parameter over a window.
///
/// The default value (all zeros, stable) is what an empty window reports.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Stat {
    pub min: f64,
    pub max: f64,
    pub average: f64,
    pub trend: Trend,
}

/// Statistics for every monitored parameter over one window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StatsReport {
    pub temperature: Stat,
    pub humidity: Stat,
    pub co2: Stat,
    pub pm25: Stat,
    pub pm10: Stat,
}

impl StatsReport {
    /// Get the statistic for a monitored parameter.
    ///
    /// Returns `None` for [`Parameter::Light`], which carries no statistics.
    #[must_use]
    pub fn get(&self, parameter: Parameter) -> Option<&Stat> {
        match parameter {
            Parameter::Temperature => Some(&self.temperature),
            Parameter::Humidity => Some(&self.humidity),
            Parameter::Co2 => Some(&self.co2),
            Parameter::Pm25 => Some(&self.pm25),
            Parameter::Pm10 => Some(&self.pm10),
            Parameter::Light => None,
        }
    }

    /// Mutable access to the statistic for a monitored parameter.
    pub fn get_mut(&mut self, parameter: Parameter) -> Option<&mut Stat> {
        match parameter {
            Parameter::Temperature => Some(&mut self.temperature),
            Parameter::Humidity => Some(&mut self.humidity),
            Parameter::Co2 => Some(&mut self.co2),
            Parameter::Pm25 => Some(&mut self.pm25),
            Parameter::Pm10 => Some(&mut self.pm10),
            Parameter::Light => None,
        }
    }
}

/// Time window for statistics queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Period {
    #[cfg_attr(feature = "serde", serde(rename = "1h"))]
    OneHour,
    #[cfg_attr(feature = "serde", serde(rename = "6h"))]
    SixHours,
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "24h"))]
    Day,
    #[cfg_attr(feature = "serde", serde(rename = "7d"))]
    Week,
}

impl Period {
    /// All supported periods, shortest first.
    pub const ALL: [Period; 4] = [
        Period::OneHour,
        Period::SixHours,
        Period::Day,
        Period::Week,
    ];

    /// The longest supported period; history older than this is never queried.
    pub const LONGEST: Period = Period::Week;

    /// Fixed duration covered by the period.
    ///
    /// ```
    /// use airwatch_types::Period;
    /// use time::Duration;
    ///
    /// assert_eq!(Period::SixHours.duration(), Duration::hours(6));
    /// assert_eq!(Period::Week.duration(), Duration::days(7));
    /// ```
    #[must_use]
    pub fn duration(&self) -> Duration {
        match self {
            Period::OneHour => Duration::hours(1),
            Period::SixHours => Duration::hours(6),
            Period::Day => Duration::hours(24),
            Period::Week => Duration::days(7),
        }
    }

    /// Wire form of the period.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneHour => "1h",
            Period::SixHours => "6h",
            Period::Day => "24h",
            Period::Week => "7d",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = ParseError;

    /// Parse a period string.
    ///
    /// ```
    /// use airwatch_types::Period;
    ///
    /// assert_eq!("6h".parse::<Period>(), Ok(Period::SixHours));
    /// assert!("2h".parse::<Period>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1h" => Ok(Period::OneHour),
            "6h" => Ok(Period::SixHours),
            "24h" => Ok(Period::Day),
            "7d" => Ok(Period::Week),
            other => Err(ParseError::InvalidPeriod(other.to_string())),
        }
    }
}
