//! Subcommand implementations.

pub mod config;
pub mod conflict;
pub mod expand;

use std::path::Path;

use freebusy_core::{Diagnostic, Expander, FreeBusy, TimeWindow};
use freebusy_ical::{CalendarEntry, parse_ics};
use serde::Serialize;
use tracing::debug;

use crate::error::{ClientError, ClientResult};

/// A diagnostic raised while expanding one calendar entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryDiagnostic {
    pub uid: String,
    pub diagnostic: Diagnostic,
}

/// Reads and parses an iCalendar file.
pub(crate) fn load_calendar(path: &Path) -> ClientResult<Vec<CalendarEntry>> {
    let content = std::fs::read_to_string(path).map_err(|source| ClientError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let entries = parse_ics(&content).map_err(|source| ClientError::Calendar {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), entries = entries.len(), "Loaded calendar");
    Ok(entries)
}

/// Collects the busy time of `entries` inside `window`.
pub(crate) fn collect_busy(
    entries: &[CalendarEntry],
    window: TimeWindow,
    expander: &Expander,
) -> (FreeBusy, Vec<EntryDiagnostic>) {
    let mut freebusy = FreeBusy::new(window);
    let mut diagnostics = Vec::new();
    for entry in entries {
        let Some(report) = entry.add_to(&mut freebusy, expander) else {
            continue;
        };
        diagnostics.extend(report.diagnostics.into_iter().map(|diagnostic| EntryDiagnostic {
            uid: entry.uid().to_string(),
            diagnostic,
        }));
    }
    (freebusy, diagnostics)
}

/// Prints diagnostics for text output.
pub(crate) fn print_diagnostics(diagnostics: &[EntryDiagnostic]) {
    for d in diagnostics {
        eprintln!("warning: [{}] {}", d.uid, d.diagnostic);
    }
}
