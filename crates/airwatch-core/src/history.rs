//! Bounded, time-ordered history of accepted readings.
//!
//! # Concurrency
//!
//! The history is published as an immutable [`HistorySnapshot`] behind an
//! atomically swappable pointer:
//!
//! - **Readers** load the current snapshot without taking any lock, so a
//!   query never waits on an append and an append never waits on a query.
//! - **The writer** builds the next snapshot from the current one and swaps
//!   it in. Appends are serialized by an internal mutex, so concurrent calls
//!   to [`HistoryStore::append`] are safe but run one at a time.
//!
//! A reader therefore observes either the state before an append or the
//! state after it, never a partially appended entry.
//!
//! # Eviction
//!
//! Two rules run on every append, before the new reading is pushed:
//!
//! 1. Age: readings older than `retention` relative to the incoming reading
//!    are dropped.
//! 2. Capacity: the oldest readings are dropped until there is room for one
//!    more.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use airwatch_types::{Period, Reading};

use crate::error::{Error, Result};

/// Default maximum number of stored readings (one week at one per minute).
pub const DEFAULT_CAPACITY: usize = 10_080;

/// Immutable view of the history at one point in time, oldest first.
#[derive(Debug, Clone, Default)]
pub struct HistorySnapshot {
    readings: VecDeque<Reading>,
}

impl HistorySnapshot {
    /// Number of readings in the snapshot.
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Whether the snapshot holds no readings.
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// The newest reading.
    pub fn latest(&self) -> Option<&Reading> {
        self.readings.back()
    }

    /// The oldest reading.
    pub fn oldest(&self) -> Option<&Reading> {
        self.readings.front()
    }

    /// Iterate over readings, oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Reading> + ExactSizeIterator {
        self.readings.iter()
    }

    /// The most recent `limit` readings, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<Reading> {
        let start = self.readings.len().saturating_sub(limit);
        self.readings.range(start..).copied().collect()
    }

    /// All readings within `period` of `now`, oldest first.
    ///
    /// Readings stamped after `now` are not part of the window.
    pub fn window(&self, period: Period, now: OffsetDateTime) -> Vec<Reading> {
        let cutoff = now - period.duration();
        let start = self.readings.partition_point(|r| r.timestamp < cutoff);
        let end = self.readings.partition_point(|r| r.timestamp <= now);
        self.readings.range(start..end).copied().collect()
    }
}

/// What an append removed to make room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppendOutcome {
    /// Readings dropped for exceeding the retention horizon.
    pub expired: usize,
    /// Readings dropped to stay within capacity.
    pub evicted: usize,
    /// Number of readings stored after the append.
    pub len: usize,
}

/// Bounded, time-ordered reading history with lock-free reads.
#[derive(Debug)]
pub struct HistoryStore {
    current: ArcSwap<HistorySnapshot>,
    write_lock: Mutex<()>,
    capacity: usize,
    retention: Duration,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self {
            current: ArcSwap::from_pointee(HistorySnapshot::default()),
            write_lock: Mutex::new(()),
            capacity: DEFAULT_CAPACITY,
            retention: Period::LONGEST.duration(),
        }
    }
}

impl HistoryStore {
    /// Create a store holding at most `capacity` readings, retaining
    /// readings up to `retention` older than the newest one.
    pub fn new(capacity: usize, retention: Duration) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidConfig(
                "history capacity must be at least 1".to_string(),
            ));
        }
        if retention <= Duration::ZERO {
            return Err(Error::InvalidConfig(
                "history retention must be positive".to_string(),
            ));
        }
        Ok(Self {
            capacity,
            retention,
            ..Default::default()
        })
    }

    /// Create a store with the given capacity and the default one-week retention.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::new(capacity, Period::LONGEST.duration())
    }

    /// Maximum number of stored readings.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Retention horizon.
    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// The current snapshot. Cheap: clones a reference count.
    pub fn snapshot(&self) -> Arc<HistorySnapshot> {
        self.current.load_full()
    }

    /// Number of stored readings.
    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.current.load().is_empty()
    }

    /// The newest stored reading.
    pub fn latest(&self) -> Option<Reading> {
        self.current.load().latest().copied()
    }

    /// The most recent `limit` readings, oldest first.
    pub fn query(&self, limit: usize) -> Vec<Reading> {
        self.current.load().recent(limit)
    }

    /// All readings within `period` of `now`, oldest first.
    pub fn query_window(&self, period: Period, now: OffsetDateTime) -> Vec<Reading> {
        self.current.load().window(period, now)
    }

    /// Append a reading.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfOrder`] if the reading's timestamp is not
    /// strictly after the newest stored reading. The store is unchanged.
    pub fn append(&self, reading: Reading) -> Result<AppendOutcome> {
        // The guard protects no data of its own, so a poisoned lock is still usable.
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let current = self.current.load_full();
        if let Some(last) = current.latest()
            && reading.timestamp <= last.timestamp
        {
            return Err(Error::OutOfOrder {
                submitted: reading.timestamp,
                last: last.timestamp,
            });
        }

        // Copies the whole buffer; fine at sensor cadence and default capacity.
        let mut readings = current.readings.clone();
        let mut outcome = AppendOutcome::default();

        let horizon = reading.timestamp - self.retention;
        while readings.front().is_some_and(|r| r.timestamp < horizon) {
            readings.pop_front();
            outcome.expired += 1;
        }
        while readings.len() >= self.capacity {
            readings.pop_front();
            outcome.evicted += 1;
        }
        readings.push_back(reading);
        outcome.len = readings.len();

        self.current.store(Arc::new(HistorySnapshot { readings }));

        if outcome.expired > 0 || outcome.evicted > 0 {
            debug!(
                "History trimmed: {} expired, {} evicted, {} stored",
                outcome.expired, outcome.evicted, outcome.len
            );
        }

        Ok(outcome)
    }
}
