//! Occurrence delivery.
//!
//! The engine hands each occurrence to an [`OccurrenceSink`] as a start
//! instant plus the rule's duration; the sink decides what an occurrence
//! means (a busy period, a conflict, a list entry).

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::busy::BusyPeriod;

/// One concrete instance of a recurring event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Occurrence {
    pub start: DateTime<Utc>,
    pub duration: Duration,
}

impl Occurrence {
    pub fn new(start: DateTime<Utc>, duration: Duration) -> Self {
        Self { start, duration }
    }

    /// End of the occurrence (exclusive).
    pub fn end(&self) -> DateTime<Utc> {
        self.start + self.duration
    }
}

/// Receives occurrences from the expansion engine.
///
/// Any `FnMut(DateTime<Utc>, Duration)` closure is a sink.
pub trait OccurrenceSink {
    fn record(&mut self, start: DateTime<Utc>, duration: Duration);
}

impl<F> OccurrenceSink for F
where
    F: FnMut(DateTime<Utc>, Duration),
{
    fn record(&mut self, start: DateTime<Utc>, duration: Duration) {
        (*self)(start, duration)
    }
}

/// Checks occurrences of a requested event against existing busy periods.
///
/// Periods whose source is in the ignore list (typically the event being
/// updated) never conflict. Once a conflict is found later occurrences are
/// not examined.
#[derive(Debug, Clone, Default)]
pub struct ConflictDetector {
    busy: Vec<BusyPeriod>,
    ignore: HashSet<String>,
    conflict: Option<(Occurrence, BusyPeriod)>,
}

impl ConflictDetector {
    pub fn new(busy: impl IntoIterator<Item = BusyPeriod>) -> Self {
        Self {
            busy: busy.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Ignores busy periods originating from `source`.
    #[must_use]
    pub fn ignore(mut self, source: impl Into<String>) -> Self {
        self.ignore.insert(source.into());
        self
    }

    pub fn has_conflict(&self) -> bool {
        self.conflict.is_some()
    }

    /// The first clashing occurrence and the busy period it hit.
    pub fn conflicting(&self) -> Option<&(Occurrence, BusyPeriod)> {
        self.conflict.as_ref()
    }

    fn is_ignored(&self, period: &BusyPeriod) -> bool {
        period
            .source
            .as_ref()
            .is_some_and(|source| self.ignore.contains(source))
    }
}

impl OccurrenceSink for ConflictDetector {
    fn record(&mut self, start: DateTime<Utc>, duration: Duration) {
        if self.conflict.is_some() {
            return;
        }
        let end = start + duration;
        let hit = self
            .busy
            .iter()
            .find(|period| {
                !self.is_ignored(period)
                    && ((period.start >= start && period.start < end)
                        || (start >= period.start && start < period.end))
            })
            .cloned();
        if let Some(period) = hit {
            debug!(
                start = %start,
                busy_start = %period.start,
                busy_end = %period.end,
                source = ?period.source,
                "Request overlaps busy period"
            );
            self.conflict = Some((Occurrence::new(start, duration), period));
        }
    }
}
