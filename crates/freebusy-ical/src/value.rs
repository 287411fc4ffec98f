//! iCalendar date and date-time values.
//!
//! Time zones are not resolved: `TZID` and floating times are read as UTC.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use icalendar::{CalendarDateTime, DatePerhapsTime};

/// A `DATE` or `DATE-TIME` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcalTime {
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
}

impl IcalTime {
    /// The instant the value denotes; dates start at midnight UTC.
    pub fn instant(&self) -> DateTime<Utc> {
        match self {
            Self::Date(date) => date.and_time(NaiveTime::MIN).and_utc(),
            Self::DateTime(dt) => *dt,
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Date(date) => *date,
            Self::DateTime(dt) => dt.date_naive(),
        }
    }

    pub fn is_date(&self) -> bool {
        matches!(self, Self::Date(_))
    }

    /// End of an event starting at `self` that has no `DTEND`: one day
    /// for all-day events, zero length otherwise.
    pub fn default_end(&self) -> DateTime<Utc> {
        match self {
            Self::Date(_) => self.instant() + Duration::days(1),
            Self::DateTime(dt) => *dt,
        }
    }
}

impl From<DatePerhapsTime> for IcalTime {
    fn from(value: DatePerhapsTime) -> Self {
        match value {
            DatePerhapsTime::Date(date) => Self::Date(date),
            DatePerhapsTime::DateTime(cdt) => Self::DateTime(match cdt {
                CalendarDateTime::Utc(dt) => dt,
                CalendarDateTime::Floating(naive) => Utc.from_utc_datetime(&naive),
                CalendarDateTime::WithTimezone { date_time, .. } => {
                    Utc.from_utc_datetime(&date_time)
                }
            }),
        }
    }
}

/// Parses a raw value such as `20240205T100000Z`, `20240205T100000` or
/// `20240205`.
pub fn parse_ical_time(s: &str) -> Option<IcalTime> {
    let s = s.trim();

    if s.len() == 8 && s.chars().all(|c| c.is_ascii_digit()) {
        return NaiveDate::parse_from_str(s, "%Y%m%d").ok().map(IcalTime::Date);
    }

    let naive = s.strip_suffix('Z').unwrap_or(s);
    NaiveDateTime::parse_from_str(naive, "%Y%m%dT%H%M%S")
        .ok()
        .map(|dt| IcalTime::DateTime(Utc.from_utc_datetime(&dt)))
}
