//! Query windows.
//!
//! [`TimeWindow`] is the half-open `[start, end)` range a free/busy query asks
//! about. The engine itself takes the two bounds as plain instants; the window
//! type is used by callers and by [`crate::busy::FreeBusy`].

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar;

/// A time window for free/busy queries.
///
/// Represents a half-open interval `[start, end)` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "TimeWindow start must be <= end");
        Self { start, end }
    }

    /// Creates a time window, or `None` if `start` is after `end`.
    pub fn try_new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Creates a time window from a start time and duration.
    pub fn from_duration(start: DateTime<Utc>, duration: Duration) -> Self {
        Self::new(start, start + duration)
    }

    /// Covers whole UTC days, from midnight of `first` to midnight after `last`.
    pub fn for_dates(first: NaiveDate, last: NaiveDate) -> Option<Self> {
        let end = calendar::add_days(last, 1)?;
        Self::try_new(
            calendar::at_time(first, NaiveTime::MIN),
            calendar::at_time(end, NaiveTime::MIN),
        )
    }

    /// Covers a single UTC day.
    pub fn for_date(date: NaiveDate) -> Option<Self> {
        Self::for_dates(date, date)
    }

    /// Returns the duration of this time window.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Checks if a datetime falls within this window.
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        self.start <= dt && dt < self.end
    }

    /// Checks if `[start, end)` shares at least one instant with this window.
    ///
    /// A zero-length interval overlaps when its instant is contained.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        if start == end {
            return self.contains(start);
        }
        start < self.end && end > self.start
    }

    /// Restricts `[start, end)` to this window, or `None` if they don't overlap.
    pub fn clip(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = start.max(self.start);
        let end = end.min(self.end);
        (start < end).then_some((start, end))
    }
}
