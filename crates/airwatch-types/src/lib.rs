//! Platform-agnostic types for the airwatch environmental analytics engine.
//!
//! This crate provides the shared data model used by the analytics core
//! (airwatch-core) and the HTTP service (airwatch-service).
//!
//! # Features
//!
//! - Sensor readings, both validated ([`Reading`]) and as submitted ([`ReadingInput`])
//! - Derived results: safety analysis, air quality index, window statistics
//! - Query periods with fixed durations
//! - Error types for parsing wire values
//!
//! # Example
//!
//! ```
//! use airwatch_types::{Parameter, Period, Status};
//!
//! let period: Period = "1h".parse().unwrap();
//! assert_eq!(period.duration(), time::Duration::hours(1));
//! assert_eq!(Parameter::Pm25.as_str(), "pm25");
//! assert!(Status::Hazard > Status::Safe);
//! ```

pub mod error;
pub mod types;

pub use error::ParseError;
pub use types::{
    AQI_MAX, AnalysisResult, AqiCategory, AqiResult, Issue, Parameter, Period, Reading,
    ReadingInput, Stat, StatsReport, Status, Trend,
};


/// Property-based tests for wire parsing.
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Parsing arbitrary strings as a period never panics, and anything
        /// accepted round-trips through its wire form.
        #[test]
        fn parse_period_never_panics(s in ".*") {
            if let Ok(period) = s.parse::<Period>() {
                prop_assert_eq!(period.as_str().parse::<Period>(), Ok(period));
            }
        }

        /// Parsing arbitrary strings as a parameter never panics.
        #[test]
        fn parse_parameter_never_panics(s in "[a-zA-Z0-9]{0,12}") {
            let _ = s.parse::<Parameter>();
        }
    }
}
