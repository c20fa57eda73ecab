//! Error types for airwatch-core.
//!
//! Every fallible operation in the engine returns [`Error`]. None of these
//! errors is fatal: a rejected reading or query leaves stored history exactly
//! as it was, and no component retries internally.
//!
//! | Error | Raised by | Caller's recourse |
//! |-------|-----------|-------------------|
//! | [`Error::Validation`] | [`crate::IngestionPipeline::submit`] | Fix the payload; nothing was stored |
//! | [`Error::OutOfOrder`] | [`crate::HistoryStore::append`] | Drop the sample or resend with a later timestamp |
//! | [`Error::InvalidPeriod`] | period parsing | Report as a client error |
//! | [`Error::InvalidConfig`] | constructors | Fix configuration and restart |
//!
//! An empty history is not an error: queries return empty lists and
//! zeroed statistics.

use time::OffsetDateTime;

use airwatch_types::ParseError;

use crate::validation::ValidationError;

/// Errors that can occur in the analytics engine.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A submitted reading failed validation and was not stored.
    #[error("Invalid reading: {0}")]
    Validation(#[from] ValidationError),

    /// A submitted reading is not newer than the last stored reading.
    #[error("Out-of-order reading: timestamp {submitted} is not after last stored {last}")]
    OutOfOrder {
        submitted: OffsetDateTime,
        last: OffsetDateTime,
    },

    /// An unrecognized statistics period was requested.
    #[error("{0}")]
    InvalidPeriod(#[from] ParseError),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias using airwatch-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
