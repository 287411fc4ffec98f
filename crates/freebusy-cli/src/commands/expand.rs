//! `freebusy expand`: merged busy periods of a calendar.

use std::path::Path;

use chrono::{DateTime, Utc};
use freebusy_core::{BusyPeriod, Expander, TimeWindow};
use serde::Serialize;

use super::{EntryDiagnostic, collect_busy, load_calendar, print_diagnostics};
use crate::cli::WindowArgs;
use crate::config::ClientConfig;
use crate::error::ClientResult;

#[derive(Debug, Serialize)]
struct ExpandOutput<'a> {
    window: TimeWindow,
    busy: &'a [BusyPeriod],
    diagnostics: &'a [EntryDiagnostic],
}

/// Expands `file` and prints its busy periods.
pub fn run(
    file: &Path,
    window: &WindowArgs,
    json: bool,
    config: &ClientConfig,
    expander: &Expander,
) -> ClientResult<()> {
    let window = window.resolve(Utc::now().date_naive(), config.window.days)?;
    let entries = load_calendar(file)?;
    let (freebusy, diagnostics) = collect_busy(&entries, window, expander);
    let busy = freebusy.into_merged();

    if json {
        let output = ExpandOutput {
            window,
            busy: &busy,
            diagnostics: &diagnostics,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_diagnostics(&diagnostics);
        print!("{}", render_text(window, &busy));
    }
    Ok(())
}

/// Renders busy periods one per line.
pub fn render_text(window: TimeWindow, busy: &[BusyPeriod]) -> String {
    if busy.is_empty() {
        return format!(
            "No busy time between {} and {}\n",
            stamp(window.start),
            stamp(window.end)
        );
    }
    let mut out = String::new();
    for period in busy {
        out.push_str(&format_period(period));
        out.push('\n');
    }
    out
}

/// `2024-01-08 09:00 - 09:30  uid`, with the end date spelled out when the
/// period crosses midnight.
pub fn format_period(period: &BusyPeriod) -> String {
    let end = if period.end.date_naive() == period.start.date_naive() {
        period.end.format("%H:%M").to_string()
    } else {
        stamp(period.end)
    };
    match &period.source {
        Some(source) => format!("{} - {}  {}", stamp(period.start), end, source),
        None => format!("{} - {}", stamp(period.start), end),
    }
}

fn stamp(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn window() -> TimeWindow {
        TimeWindow::new(utc(2024, 1, 8, 0, 0), utc(2024, 1, 15, 0, 0))
    }

    #[test]
    fn text_output() {
        let busy = vec![
            BusyPeriod::new(utc(2024, 1, 8, 9, 0), utc(2024, 1, 8, 9, 30))
                .with_source("standup@example.com"),
            BusyPeriod::new(utc(2024, 1, 9, 22, 0), utc(2024, 1, 10, 2, 0)),
        ];
        insta::assert_snapshot!(render_text(window(), &busy), @r"
        2024-01-08 09:00 - 09:30  standup@example.com
        2024-01-09 22:00 - 2024-01-10 02:00
        ");
    }

    #[test]
    fn text_output_when_free() {
        assert_eq!(
            render_text(window(), &[]),
            "No busy time between 2024-01-08 00:00 and 2024-01-15 00:00\n"
        );
    }

    #[test]
    fn json_output_shape() {
        let busy = vec![BusyPeriod::new(utc(2024, 1, 8, 9, 0), utc(2024, 1, 8, 9, 30))];
        let output = ExpandOutput {
            window: window(),
            busy: &busy,
            diagnostics: &[],
        };
        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["busy"][0]["start"], "2024-01-08T09:00:00Z");
        assert!(value["busy"][0].get("source").is_none());
        assert_eq!(value["diagnostics"], serde_json::json!([]));
    }
}
