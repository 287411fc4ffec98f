//! `VEVENT` conversion.
//!
//! Each event of a calendar becomes a [`CalendarEntry`]: a one-off busy
//! interval, or a [`RecurrenceRule`] when the event carries an `RRULE`.
//! Cancelled and transparent events never block time and are left out.

use chrono::{DateTime, NaiveDate, Utc};
use freebusy_core::{
    BusyPeriod, ExpandReport, Expander, FreeBusy, OccurrenceSink, RecurrenceRule, TimeWindow,
};
use icalendar::{Calendar, CalendarComponent, Component, Event, EventStatus};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{IcalError, IcalResult};
use crate::rrule::parse_rrule;
use crate::value::{IcalTime, parse_ical_time};

/// One blocking event of a calendar.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalendarEntry {
    Single {
        uid: String,
        summary: Option<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    Recurring {
        uid: String,
        summary: Option<String>,
        rule: RecurrenceRule,
    },
}

impl CalendarEntry {
    pub fn uid(&self) -> &str {
        match self {
            Self::Single { uid, .. } | Self::Recurring { uid, .. } => uid,
        }
    }

    pub fn summary(&self) -> Option<&str> {
        match self {
            Self::Single { summary, .. } | Self::Recurring { summary, .. } => summary.as_deref(),
        }
    }

    /// Start of the event, or of the first instance of a series.
    pub fn start(&self) -> DateTime<Utc> {
        match self {
            Self::Single { start, .. } => *start,
            Self::Recurring { rule, .. } => rule.initial_start(),
        }
    }

    pub fn is_recurring(&self) -> bool {
        matches!(self, Self::Recurring { .. })
    }

    /// Adds the entry's busy time to `freebusy`, tagged with its UID.
    ///
    /// Returns the expansion report for recurring entries.
    pub fn add_to(&self, freebusy: &mut FreeBusy, expander: &Expander) -> Option<ExpandReport> {
        match self {
            Self::Single { uid, start, end, .. } => {
                freebusy.add_period(BusyPeriod::new(*start, *end).with_source(uid.as_str()));
                None
            }
            Self::Recurring { uid, rule, .. } => {
                Some(freebusy.add_rule(rule, Some(uid.as_str()), expander))
            }
        }
    }

    /// Sends every occurrence of the entry overlapping `window` to `sink`.
    pub fn occurrences_into<S>(&self, window: TimeWindow, expander: &Expander, sink: &mut S)
    where
        S: OccurrenceSink + ?Sized,
    {
        match self {
            Self::Single { start, end, .. } => {
                if window.overlaps(*start, *end) {
                    sink.record(*start, *end - *start);
                }
            }
            Self::Recurring { rule, .. } => {
                expander.expand(rule, window.start, window.end, sink);
            }
        }
    }
}

/// Parses iCalendar text into blocking entries.
///
/// Events that cannot be converted are skipped with a warning; the rest of
/// the calendar is still returned.
///
/// # Errors
///
/// Fails only when `content` is not an iCalendar object.
pub fn parse_ics(content: &str) -> IcalResult<Vec<CalendarEntry>> {
    let calendar = content
        .parse::<Calendar>()
        .map_err(|e| IcalError::invalid_calendar(format!("failed to parse calendar: {e}")))?;

    let mut entries = Vec::new();
    for component in calendar.iter() {
        let CalendarComponent::Event(event) = component else {
            continue;
        };
        match parse_event(event) {
            Ok(Some(entry)) => entries.push(entry),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Skipping event"),
        }
    }
    debug!(entries = entries.len(), "Parsed calendar");
    Ok(entries)
}

/// Converts one `VEVENT`; `Ok(None)` for events that do not block time.
///
/// # Errors
///
/// Fails when `UID` or `DTSTART` is missing, the `RRULE` is unsupported or
/// the event ends before it starts.
pub fn parse_event(event: &Event) -> IcalResult<Option<CalendarEntry>> {
    let uid = event.get_uid().ok_or_else(|| IcalError::missing("UID"))?.to_string();

    if matches!(event.get_status(), Some(EventStatus::Cancelled)) {
        debug!(%uid, "Ignoring cancelled event");
        return Ok(None);
    }
    if event
        .property_value("TRANSP")
        .is_some_and(|transp| transp.trim().eq_ignore_ascii_case("TRANSPARENT"))
    {
        debug!(%uid, "Ignoring transparent event");
        return Ok(None);
    }

    let start = event
        .get_start()
        .map(IcalTime::from)
        .ok_or_else(|| IcalError::missing("DTSTART").with_uid(&uid))?;
    let end = event
        .get_end()
        .map(|end| IcalTime::from(end).instant())
        .unwrap_or_else(|| start.default_end());
    let summary = event.get_summary().map(str::to_string);

    let Some(rrule) = event.property_value("RRULE") else {
        if end < start.instant() {
            return Err(IcalError::invalid_value("DTEND is before DTSTART").with_uid(&uid));
        }
        return Ok(Some(CalendarEntry::Single {
            uid,
            summary,
            start: start.instant(),
            end,
        }));
    };

    let exclusions = event
        .property_value("EXDATE")
        .map(|value| exclusion_dates(value, &uid))
        .unwrap_or_default();
    let rule = parse_rrule(rrule)
        .and_then(|parts| parts.to_rule(start.instant(), end, exclusions))
        .map_err(|e| e.with_uid(&uid))?;

    debug!(%uid, cycle = %rule.cycle(), "Parsed recurring event");
    Ok(Some(CalendarEntry::Recurring { uid, summary, rule }))
}

/// Parses a comma separated `EXDATE` value into civil dates.
fn exclusion_dates(value: &str, uid: &str) -> Vec<NaiveDate> {
    value
        .split(',')
        .filter(|v| !v.trim().is_empty())
        .filter_map(|v| match parse_ical_time(v) {
            Some(time) => Some(time.date()),
            None => {
                warn!(%uid, value = v, "Ignoring unparseable EXDATE");
                None
            }
        })
        .collect()
}
