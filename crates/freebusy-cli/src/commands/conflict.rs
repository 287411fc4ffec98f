//! `freebusy conflict`: does a requested event clash with a calendar?

use std::path::Path;

use chrono::{DateTime, Utc};
use freebusy_core::{BusyPeriod, ConflictDetector, Expander, TimeWindow};
use freebusy_ical::CalendarEntry;
use serde::Serialize;
use tracing::{info, warn};

use super::{EntryDiagnostic, collect_busy, load_calendar, print_diagnostics};
use crate::cli::WindowArgs;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Paths and filters of one conflict check.
#[derive(Debug)]
pub struct ConflictRequest<'a> {
    pub request: &'a Path,
    pub calendar: &'a Path,
    pub ignore: &'a [String],
    pub window: &'a WindowArgs,
}

#[derive(Debug, Serialize)]
struct ConflictOutput<'a> {
    conflict: bool,
    request: &'a str,
    window: TimeWindow,
    #[serde(skip_serializing_if = "Option::is_none")]
    occurrence: Option<Span>,
    #[serde(skip_serializing_if = "Option::is_none")]
    busy: Option<&'a BusyPeriod>,
    diagnostics: &'a [EntryDiagnostic],
}

#[derive(Debug, Serialize)]
struct Span {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

/// Checks the request against the calendar. Returns `true` on conflict.
///
/// Busy time contributed by the request's own UID is ignored, so an event can
/// be checked against a calendar that already contains it.
pub fn run(
    args: &ConflictRequest<'_>,
    json: bool,
    config: &ClientConfig,
    expander: &Expander,
) -> ClientResult<bool> {
    let requested = load_calendar(args.request)?;
    let entry = requested
        .first()
        .ok_or_else(|| ClientError::EmptyRequest(args.request.to_path_buf()))?;
    if requested.len() > 1 {
        warn!(
            uid = entry.uid(),
            ignored = requested.len() - 1,
            "Request holds several events, checking the first"
        );
    }

    let window = args
        .window
        .resolve(entry.start().date_naive(), config.window.days)?;
    let calendar = load_calendar(args.calendar)?;
    let (freebusy, diagnostics) = collect_busy(&calendar, window, expander);

    let detector = check(entry, freebusy.periods(), args.ignore, window, expander);
    let conflict = detector.conflicting();
    info!(uid = entry.uid(), conflict = conflict.is_some(), "Checked request");

    if json {
        let output = ConflictOutput {
            conflict: conflict.is_some(),
            request: entry.uid(),
            window,
            occurrence: conflict.map(|(occ, _)| Span {
                start: occ.start,
                end: occ.end(),
            }),
            busy: conflict.map(|(_, period)| period),
            diagnostics: &diagnostics,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_diagnostics(&diagnostics);
        match conflict {
            Some((occ, period)) => println!(
                "conflict: {} at {} overlaps {}",
                entry.uid(),
                occ.start.format("%Y-%m-%d %H:%M"),
                super::expand::format_period(period)
            ),
            None => println!("no conflict"),
        }
    }
    Ok(conflict.is_some())
}

/// Runs every occurrence of `entry` inside `window` against `busy`.
fn check(
    entry: &CalendarEntry,
    busy: &[BusyPeriod],
    ignore: &[String],
    window: TimeWindow,
    expander: &Expander,
) -> ConflictDetector {
    let mut detector = ConflictDetector::new(busy.iter().cloned()).ignore(entry.uid());
    for uid in ignore {
        detector = detector.ignore(uid.as_str());
    }
    entry.occurrences_into(window, expander, &mut detector);
    detector
}
