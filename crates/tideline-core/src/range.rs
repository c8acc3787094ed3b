//! Half-open time ranges.
//!
//! Every range in the engine is `[start, end)`: the start instant is
//! included, the end instant is not. Viewports, backend range queries, and
//! sync windows all use the same representation so intersection rules are
//! decided in exactly one place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error produced when an interval would end before it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid interval: end {end} is before start {start}")]
pub struct InvalidInterval {
    /// Requested start instant.
    pub start: DateTime<Utc>,
    /// Requested end instant.
    pub end: DateTime<Utc>,
}

/// A half-open `[start, end)` time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateRange {
    /// Build a range, rejecting `end < start`.
    ///
    /// `end == start` is allowed and denotes an empty range.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInterval`] when `end < start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, InvalidInterval> {
        if end < start {
            return Err(InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }

    /// Start instant (inclusive).
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// End instant (exclusive).
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Whether an instant falls inside `[start, end)`.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Whether an item span `[start, end)` intersects this range.
    ///
    /// Instantaneous spans (`start == end`, e.g. a task deadline pinned to a
    /// single moment) intersect when their instant falls inside the range;
    /// the plain half-open overlap test would always exclude them.
    #[must_use]
    pub fn intersects_span(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        if start == end {
            return self.contains(start);
        }
        start < self.end && end > self.start
    }
}
