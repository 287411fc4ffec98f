//! Civil calendar arithmetic.
//!
//! Every date computation in the engine goes through this module and uses the
//! UTC civil calendar, so exclusion matching and occurrence generation never
//! disagree about which day an instant falls on.
//!
//! Functions that can leave the representable range or the target month/year
//! return `None` instead of rolling over.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, Utc};

/// Truncates an instant to its UTC civil date.
pub fn civil_date(instant: DateTime<Utc>) -> NaiveDate {
    instant.date_naive()
}

/// Combines a civil date with a time of day into a UTC instant.
pub fn at_time(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    date.and_time(time).and_utc()
}

/// Returns the Sunday that starts the week containing `date`.
pub fn start_of_week(date: NaiveDate) -> Option<NaiveDate> {
    let offset = date.weekday().num_days_from_sunday();
    date.checked_sub_days(Days::new(u64::from(offset)))
}

/// Returns the first day of the month containing `date`.
pub fn start_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

/// Returns January 1st of the year containing `date`.
pub fn start_of_year(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.ordinal0()))
}

/// Adds `days` days, or `None` on overflow.
pub fn add_days(date: NaiveDate, days: u64) -> Option<NaiveDate> {
    date.checked_add_days(Days::new(days))
}

/// Adds `months` calendar months, clamping the day to the target month.
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(months))
}

/// Adds `years` calendar years, clamping Feb 29 to Feb 28.
pub fn add_years(date: NaiveDate, years: u32) -> Option<NaiveDate> {
    add_months(date, years.checked_mul(12)?)
}

/// Number of days in the given month, or 0 for an invalid month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .filter(|last| last.month() == month)
        .map_or(0, |last| last.day())
}

/// Number of days in the given year (365 or 366).
pub fn days_in_year(year: i32) -> u32 {
    NaiveDate::from_ymd_opt(year, 12, 31).map_or(0, |last| last.ordinal())
}

/// Resolves a signed position inside a period of `len` days.
///
/// `1` is the first day, `-1` the last; `0` and positions past either end
/// resolve to nothing.
fn resolve_position(n: i32, len: u32) -> Option<u32> {
    let len = i64::from(len);
    let n = i64::from(n);
    let position = match n {
        0 => return None,
        n if n > 0 => n,
        n => len + 1 + n,
    };
    if (1..=len).contains(&position) {
        u32::try_from(position).ok()
    } else {
        None
    }
}

/// The `n`th day of a month; negative `n` counts back from the last day.
pub fn nth_day_of_month(year: i32, month: u32, n: i32) -> Option<NaiveDate> {
    let day = resolve_position(n, days_in_month(year, month))?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// The `n`th day of a year; negative `n` counts back from December 31st.
pub fn nth_day_of_year(year: i32, n: i32) -> Option<NaiveDate> {
    let ordinal = resolve_position(n, days_in_year(year))?;
    NaiveDate::from_yo_opt(year, ordinal)
}

/// The `n`th given weekday of a month (`weekday`: 0 = Sunday .. 6 = Saturday).
///
/// Negative `n` counts from the end of the month, so `-1` is the last such
/// weekday. Returns `None` when the month has no such occurrence.
pub fn nth_weekday_of_month(year: i32, month: u32, weekday: u32, n: i32) -> Option<NaiveDate> {
    if weekday > 6 || n == 0 {
        return None;
    }
    let len = days_in_month(year, month);
    let weekday = i64::from(weekday);
    let weeks = i64::from(n.unsigned_abs()) - 1;

    let day = if n > 0 {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let first = i64::from(first.weekday().num_days_from_sunday());
        1 + (7 + weekday - first) % 7 + weeks * 7
    } else {
        let last = NaiveDate::from_ymd_opt(year, month, len)?;
        let last_weekday = i64::from(last.weekday().num_days_from_sunday());
        i64::from(len) - (7 + last_weekday - weekday) % 7 - weeks * 7
    };

    if day < 1 || day > i64::from(len) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, u32::try_from(day).ok()?)
}
