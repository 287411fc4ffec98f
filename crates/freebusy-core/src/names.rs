//! Weekday and month name lookup.
//!
//! Rules keep their selectors as the names the calendar store wrote, so a
//! misspelled name must be detectable at expansion time. Both lookups return
//! `None` for anything they do not recognise; callers skip such selectors and
//! never turn the miss into an index.

use chrono::{Month, Weekday};

/// Maps a weekday name to 0 = Sunday .. 6 = Saturday.
///
/// Accepts full English names, three-letter abbreviations and the two-letter
/// iCalendar codes (`MO`, `TU`, ...), case-insensitively.
pub fn weekday_index(name: &str) -> Option<u32> {
    let name = name.trim();
    let weekday = match name.to_ascii_lowercase().as_str() {
        "su" => Weekday::Sun,
        "mo" => Weekday::Mon,
        "tu" => Weekday::Tue,
        "we" => Weekday::Wed,
        "th" => Weekday::Thu,
        "fr" => Weekday::Fri,
        "sa" => Weekday::Sat,
        _ => name.parse::<Weekday>().ok()?,
    };
    Some(weekday.num_days_from_sunday())
}

/// Maps a month name or number to 1 = January .. 12 = December.
///
/// Accepts full English names, three-letter abbreviations and the decimal
/// numbers `1` to `12`.
pub fn month_index(name: &str) -> Option<u32> {
    let name = name.trim();
    if let Ok(number) = name.parse::<u32>() {
        return (1..=12).contains(&number).then_some(number);
    }
    name.parse::<Month>().ok().map(|month| month.number_from_month())
}

/// The iCalendar two-letter code for a weekday.
pub fn weekday_code(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Sun => "SU",
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
    }
}
