//! Free/busy assembly.
//!
//! [`FreeBusy`] gathers busy periods for one query window, from one-off
//! events and from expanded recurrence rules, and merges them into the sorted,
//! non-overlapping list a free/busy response carries.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::expand::{ExpandReport, Expander};
use crate::rule::RecurrenceRule;
use crate::sink::OccurrenceSink;
use crate::time::TimeWindow;

/// A busy interval `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Identifier of the event the period came from, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl BusyPeriod {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Busy periods collected for one query window.
#[derive(Debug, Clone)]
pub struct FreeBusy {
    window: TimeWindow,
    periods: Vec<BusyPeriod>,
}

impl FreeBusy {
    pub fn new(window: TimeWindow) -> Self {
        Self {
            window,
            periods: Vec::new(),
        }
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    /// Periods collected so far, unmerged and in insertion order.
    pub fn periods(&self) -> &[BusyPeriod] {
        &self.periods
    }

    /// Adds a one-off busy period; periods outside the window are dropped.
    pub fn add_period(&mut self, period: BusyPeriod) {
        if self.window.overlaps(period.start, period.end) {
            self.periods.push(period);
        }
    }

    /// Expands `rule` over the window and adds every occurrence.
    pub fn add_rule(
        &mut self,
        rule: &RecurrenceRule,
        source: Option<&str>,
        expander: &Expander,
    ) -> ExpandReport {
        let mut collector = Collector {
            periods: &mut self.periods,
            source,
        };
        expander.expand(rule, self.window.start, self.window.end, &mut collector)
    }

    /// Sorts, clips to the window and merges overlapping or touching periods.
    ///
    /// A merged period keeps its source only if every part shared it.
    pub fn into_merged(self) -> Vec<BusyPeriod> {
        let window = self.window;
        let mut periods: Vec<BusyPeriod> = self
            .periods
            .into_iter()
            .filter_map(|period| {
                let (start, end) = window.clip(period.start, period.end)?;
                Some(BusyPeriod {
                    start,
                    end,
                    source: period.source,
                })
            })
            .collect();
        periods.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));

        let mut merged: Vec<BusyPeriod> = Vec::with_capacity(periods.len());
        for period in periods {
            match merged.last_mut() {
                Some(last) if period.start <= last.end => {
                    last.end = last.end.max(period.end);
                    if last.source != period.source {
                        last.source = None;
                    }
                }
                _ => merged.push(period),
            }
        }

        debug!(
            window_start = %window.start,
            window_end = %window.end,
            periods = merged.len(),
            "Merged busy periods"
        );
        merged
    }
}

struct Collector<'a> {
    periods: &'a mut Vec<BusyPeriod>,
    source: Option<&'a str>,
}

impl OccurrenceSink for Collector<'_> {
    fn record(&mut self, start: DateTime<Utc>, duration: Duration) {
        let mut period = BusyPeriod::new(start, start + duration);
        period.source = self.source.map(str::to_string);
        self.periods.push(period);
    }
}
