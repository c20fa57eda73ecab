//! Error types for parsing airwatch wire values.

use thiserror::Error;

/// Errors that can occur when parsing query or wire values.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The period string is not one of `1h`, `6h`, `24h`, `7d`.
    #[error("Invalid period '{0}': expected one of 1h, 6h, 24h, 7d")]
    InvalidPeriod(String),

    /// The parameter name is not a known sensor field.
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),
}
