//! `RRULE` parsing and conversion to [`RecurrenceRule`].
//!
//! Only the parts the engine can express are read: `FREQ` (daily to
//! yearly), `INTERVAL`, `COUNT`, `UNTIL`, `BYDAY`, `BYMONTHDAY`, `BYMONTH`
//! and `BYYEARDAY`. Everything else is ignored.
//!
//! `COUNT` becomes [`Range::Count`], which limits cycle iterations rather
//! than occurrences: `FREQ=WEEKLY;BYDAY=MO,WE;COUNT=4` covers four weeks.

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use freebusy_core::names::weekday_code;
use freebusy_core::{CycleType, PatternType, Range, RecurrenceRule};
use regex::Regex;
use tracing::debug;

use crate::error::{IcalError, IcalResult};
use crate::value::parse_ical_time;

static BYDAY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-]?\d{1,2})?(MO|TU|WE|TH|FR|SA|SU)$").expect("Invalid BYDAY regex")
});

/// `FREQ` values the engine can expand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl FromStr for Frequency {
    type Err = IcalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DAILY" => Ok(Self::Daily),
            "WEEKLY" => Ok(Self::Weekly),
            "MONTHLY" => Ok(Self::Monthly),
            "YEARLY" => Ok(Self::Yearly),
            _ => Err(IcalError::unsupported_frequency(s.trim())),
        }
    }
}

/// One `BYDAY` entry: `MO`, `2TU`, `-1FR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekdayNum {
    pub ordinal: Option<i32>,
    pub weekday: Weekday,
}

impl FromStr for WeekdayNum {
    type Err = IcalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let caps = BYDAY_REGEX
            .captures(&upper)
            .ok_or_else(|| IcalError::invalid_value(format!("invalid BYDAY value `{s}`")))?;

        let ordinal = caps
            .get(1)
            .map(|m| number::<i32>("BYDAY", m.as_str()))
            .transpose()?;
        let weekday = match &caps[2] {
            "MO" => Weekday::Mon,
            "TU" => Weekday::Tue,
            "WE" => Weekday::Wed,
            "TH" => Weekday::Thu,
            "FR" => Weekday::Fri,
            "SA" => Weekday::Sat,
            _ => Weekday::Sun,
        };
        Ok(Self { ordinal, weekday })
    }
}

/// The parts of an `RRULE` the engine understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RRuleParts {
    pub freq: Frequency,
    pub interval: Option<u32>,
    pub count: Option<u32>,
    pub until: Option<DateTime<Utc>>,
    pub by_day: Vec<WeekdayNum>,
    pub by_month_day: Vec<i32>,
    pub by_month: Vec<u32>,
    pub by_year_day: Vec<i32>,
}

/// Parses an `RRULE` value, with or without the `RRULE:` prefix.
///
/// # Errors
///
/// Fails on a missing or unsupported `FREQ` and on values that do not parse.
pub fn parse_rrule(text: &str) -> IcalResult<RRuleParts> {
    let text = text.trim();
    let text = text.strip_prefix("RRULE:").unwrap_or(text);

    let mut freq = None;
    let mut parts = RRuleParts {
        freq: Frequency::Daily,
        interval: None,
        count: None,
        until: None,
        by_day: Vec::new(),
        by_month_day: Vec::new(),
        by_month: Vec::new(),
        by_year_day: Vec::new(),
    };

    for part in text.split(';').filter(|p| !p.trim().is_empty()) {
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| IcalError::invalid_value(format!("malformed RRULE part `{part}`")))?;
        let value = value.trim();

        match key.trim().to_ascii_uppercase().as_str() {
            "FREQ" => freq = Some(value.parse::<Frequency>()?),
            "INTERVAL" => parts.interval = Some(number("INTERVAL", value)?),
            "COUNT" => parts.count = Some(number("COUNT", value)?),
            "UNTIL" => {
                let until = parse_ical_time(value).ok_or_else(|| {
                    IcalError::invalid_value(format!("invalid UNTIL value `{value}`"))
                })?;
                parts.until = Some(until.instant());
            }
            "BYDAY" => parts.by_day = list(value, str::parse)?,
            "BYMONTHDAY" => parts.by_month_day = list(value, |v| number("BYMONTHDAY", v))?,
            "BYYEARDAY" => parts.by_year_day = list(value, |v| number("BYYEARDAY", v))?,
            "BYMONTH" => {
                parts.by_month = list(value, |v| {
                    let month: u32 = number("BYMONTH", v)?;
                    if (1..=12).contains(&month) {
                        Ok(month)
                    } else {
                        Err(IcalError::invalid_value(format!("BYMONTH out of range: {month}")))
                    }
                })?;
            }
            other => debug!(key = other, "Ignoring RRULE part"),
        }
    }

    parts.freq = freq.ok_or_else(|| IcalError::missing("FREQ"))?;
    Ok(parts)
}

fn number<T: FromStr>(key: &str, value: &str) -> IcalResult<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .trim_start_matches('+')
        .parse::<T>()
        .map_err(|e| {
            IcalError::invalid_value(format!("invalid {key} value `{value}`")).with_source(e)
        })
}

fn list<T>(value: &str, parse: impl Fn(&str) -> IcalResult<T>) -> IcalResult<Vec<T>> {
    value
        .split(',')
        .filter(|v| !v.trim().is_empty())
        .map(parse)
        .collect()
}

impl RRuleParts {
    fn range(&self) -> Range {
        match (self.count, self.until) {
            (Some(count), _) => Range::Count(count),
            (None, Some(until)) => Range::Until(until),
            (None, None) => Range::Unbounded,
        }
    }

    /// `(ordinal, weekday)` pairs for ordinal patterns; a weekday without an
    /// ordinal stands for its first to fifth occurrence.
    fn ordinal_pairs(&self) -> Vec<(i32, &'static str)> {
        let mut pairs = Vec::new();
        for day in &self.by_day {
            let code = weekday_code(day.weekday);
            match day.ordinal {
                Some(n) => pairs.push((n, code)),
                None => pairs.extend((1..=5).map(|n| (n, code))),
            }
        }
        pairs
    }

    /// `BYMONTH`, or the month of the first occurrence.
    fn months_or(&self, start: DateTime<Utc>) -> Vec<u32> {
        if self.by_month.is_empty() {
            vec![start.month()]
        } else {
            self.by_month.clone()
        }
    }

    /// Builds the engine rule for an event whose first occurrence is
    /// `[start, end)`.
    ///
    /// # Errors
    ///
    /// Fails when the rule builder rejects the result, e.g. `end < start`.
    pub fn to_rule(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclusions: impl IntoIterator<Item = NaiveDate>,
    ) -> IcalResult<RecurrenceRule> {
        let builder = RecurrenceRule::builder(start, end)
            .interval(self.interval.unwrap_or(1))
            .range(self.range())
            .exclusions(exclusions);

        let builder = match self.freq {
            Frequency::Daily => builder.cycle(CycleType::Daily),
            Frequency::Weekly => {
                let weekdays: Vec<&str> = if self.by_day.is_empty() {
                    vec![weekday_code(start.weekday())]
                } else {
                    self.by_day.iter().map(|d| weekday_code(d.weekday)).collect()
                };
                builder.cycle(CycleType::Weekly).weekdays(weekdays)
            }
            Frequency::Monthly if !self.by_day.is_empty() => {
                let (days, weekdays): (Vec<i32>, Vec<&str>) =
                    self.ordinal_pairs().into_iter().unzip();
                builder
                    .cycle(CycleType::Monthly)
                    .pattern(PatternType::WeekdayOrdinal)
                    .day_numbers(days)
                    .weekdays(weekdays)
            }
            Frequency::Monthly => {
                let days = if self.by_month_day.is_empty() {
                    vec![day_of(start)]
                } else {
                    self.by_month_day.clone()
                };
                builder
                    .cycle(CycleType::Monthly)
                    .pattern(PatternType::DayNumber)
                    .day_numbers(days)
            }
            Frequency::Yearly if !self.by_day.is_empty() => {
                let mut days = Vec::new();
                let mut weekdays = Vec::new();
                let mut months = Vec::new();
                for month in self.months_or(start) {
                    for (n, code) in self.ordinal_pairs() {
                        days.push(n);
                        weekdays.push(code);
                        months.push(month.to_string());
                    }
                }
                builder
                    .cycle(CycleType::Yearly)
                    .pattern(PatternType::WeekdayOrdinal)
                    .day_numbers(days)
                    .weekdays(weekdays)
                    .months(months)
            }
            Frequency::Yearly if !self.by_year_day.is_empty() => builder
                .cycle(CycleType::Yearly)
                .pattern(PatternType::YearDay)
                .day_numbers(self.by_year_day.clone()),
            Frequency::Yearly => {
                let month_days = if self.by_month_day.is_empty() {
                    vec![day_of(start)]
                } else {
                    self.by_month_day.clone()
                };
                let mut days = Vec::new();
                let mut months = Vec::new();
                for month in self.months_or(start) {
                    for &day in &month_days {
                        days.push(day);
                        months.push(month.to_string());
                    }
                }
                builder
                    .cycle(CycleType::Yearly)
                    .pattern(PatternType::MonthDay)
                    .day_numbers(days)
                    .months(months)
            }
        };

        Ok(builder.build()?)
    }
}

fn day_of(start: DateTime<Utc>) -> i32 {
    // day() is at most 31
    i32::try_from(start.day()).unwrap_or(1)
}
