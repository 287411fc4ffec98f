//! Recurrence rules.
//!
//! A [`RecurrenceRule`] describes one recurring event: when the first
//! occurrence happens, how the series repeats, when it stops and which days
//! are skipped. Rules are immutable once built; the expansion engine only
//! reads them.
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use freebusy_core::{CycleType, RecurrenceRule};
//!
//! let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
//! let end = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
//! let rule = RecurrenceRule::builder(start, end)
//!     .cycle(CycleType::Weekly)
//!     .weekdays(["monday", "wednesday"])
//!     .count(10)
//!     .build()
//!     .unwrap();
//! assert_eq!(rule.duration(), chrono::Duration::hours(1));
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::error::{RuleError, RuleResult};

/// How often the series repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleType {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl CycleType {
    /// Returns the lowercase name used by calendar stores.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl fmt::Display for CycleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CycleType {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            _ => Err(RuleError::UnknownCycle(s.to_string())),
        }
    }
}

/// How the day selectors of a monthly or yearly rule are read.
///
/// Daily and weekly rules ignore the pattern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    /// `day_numbers` are days of the month (monthly) or of the year (yearly).
    #[default]
    DayNumber,
    /// `(day_numbers[i], weekdays[i])` is "the i-th such weekday", within the
    /// anchor month or within `months[i]` for yearly rules.
    WeekdayOrdinal,
    /// `(day_numbers[i], months[i])` is a calendar date in the anchor year.
    MonthDay,
    /// `day_numbers` are days of the year.
    YearDay,
}

impl PatternType {
    /// Returns the name used by calendar stores.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DayNumber => "daynumber",
            Self::WeekdayOrdinal => "weekday",
            Self::MonthDay => "monthday",
            Self::YearDay => "yearday",
        }
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternType {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daynumber" => Ok(Self::DayNumber),
            "weekday" => Ok(Self::WeekdayOrdinal),
            "monthday" => Ok(Self::MonthDay),
            "yearday" => Ok(Self::YearDay),
            _ => Err(RuleError::UnknownPattern(s.to_string())),
        }
    }
}

/// When the series stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Range {
    /// A maximum number of cycle iterations.
    ///
    /// See [`crate::CountPolicy`] for whether the limit itself is included.
    Count(u32),
    /// The last permissible cycle-anchor date.
    Until(DateTime<Utc>),
    /// No limit; only the query window bounds the expansion.
    #[default]
    Unbounded,
}

/// One recurring event.
///
/// Deserialization goes through [`RuleBuilder::build`], so a serialized rule
/// that ends before it starts is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RuleFields")]
pub struct RecurrenceRule {
    initial_start: DateTime<Utc>,
    initial_end: DateTime<Utc>,
    cycle: CycleType,
    pattern: PatternType,
    interval: u32,
    day_numbers: Vec<i32>,
    weekdays: Vec<String>,
    months: Vec<String>,
    range: Range,
    exclusions: BTreeSet<NaiveDate>,
}

#[derive(Deserialize)]
struct RuleFields {
    initial_start: DateTime<Utc>,
    initial_end: DateTime<Utc>,
    cycle: CycleType,
    #[serde(default)]
    pattern: PatternType,
    #[serde(default)]
    interval: u32,
    #[serde(default)]
    day_numbers: Vec<i32>,
    #[serde(default)]
    weekdays: Vec<String>,
    #[serde(default)]
    months: Vec<String>,
    #[serde(default)]
    range: Range,
    #[serde(default)]
    exclusions: BTreeSet<NaiveDate>,
}

impl TryFrom<RuleFields> for RecurrenceRule {
    type Error = RuleError;

    fn try_from(fields: RuleFields) -> RuleResult<Self> {
        RecurrenceRule::builder(fields.initial_start, fields.initial_end)
            .cycle(fields.cycle)
            .pattern(fields.pattern)
            .interval(fields.interval)
            .day_numbers(fields.day_numbers)
            .weekdays(fields.weekdays)
            .months(fields.months)
            .range(fields.range)
            .exclusions(fields.exclusions)
            .build()
    }
}

impl RecurrenceRule {
    /// Starts building a rule whose first occurrence is `[start, end)`.
    pub fn builder(start: DateTime<Utc>, end: DateTime<Utc>) -> RuleBuilder {
        RuleBuilder::new(start, end)
    }

    /// Start of the first occurrence.
    pub fn initial_start(&self) -> DateTime<Utc> {
        self.initial_start
    }

    /// End of the first occurrence.
    pub fn initial_end(&self) -> DateTime<Utc> {
        self.initial_end
    }

    /// Length of every occurrence.
    pub fn duration(&self) -> Duration {
        self.initial_end - self.initial_start
    }

    pub fn cycle(&self) -> CycleType {
        self.cycle
    }

    pub fn pattern(&self) -> PatternType {
        self.pattern
    }

    /// Step between cycle anchors; never less than 1.
    pub fn interval(&self) -> u32 {
        self.interval.max(1)
    }

    pub fn day_numbers(&self) -> &[i32] {
        &self.day_numbers
    }

    pub fn weekdays(&self) -> &[String] {
        &self.weekdays
    }

    pub fn months(&self) -> &[String] {
        &self.months
    }

    pub fn range(&self) -> Range {
        self.range
    }

    pub fn exclusions(&self) -> &BTreeSet<NaiveDate> {
        &self.exclusions
    }

    /// Checks whether `date` is one of the excluded calendar dates.
    pub fn is_excluded_date(&self, date: NaiveDate) -> bool {
        self.exclusions.contains(&date)
    }

    /// Checks whether an occurrence spanning `[start, end]` touches an
    /// excluded date.
    ///
    /// Both bounds are truncated to their civil dates and the test is
    /// inclusive at both ends, so a multi-day occurrence is excluded by any
    /// date it covers.
    pub fn is_excluded(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        let first = calendar::civil_date(start);
        let last = calendar::civil_date(end);
        if last < first {
            return false;
        }
        self.exclusions.range(first..=last).next().is_some()
    }
}

/// Builder for [`RecurrenceRule`].
///
/// Name-based setters record the first parse failure and report it from
/// [`RuleBuilder::build`].
#[derive(Debug, Clone)]
pub struct RuleBuilder {
    initial_start: DateTime<Utc>,
    initial_end: DateTime<Utc>,
    cycle: Option<CycleType>,
    pattern: PatternType,
    interval: u32,
    day_numbers: Vec<i32>,
    weekdays: Vec<String>,
    months: Vec<String>,
    range: Range,
    exclusions: BTreeSet<NaiveDate>,
    error: Option<RuleError>,
}

impl RuleBuilder {
    fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            initial_start: start,
            initial_end: end,
            cycle: None,
            pattern: PatternType::default(),
            interval: 1,
            day_numbers: Vec::new(),
            weekdays: Vec::new(),
            months: Vec::new(),
            range: Range::Unbounded,
            exclusions: BTreeSet::new(),
            error: None,
        }
    }

    fn fail(&mut self, error: RuleError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    #[must_use]
    pub fn cycle(mut self, cycle: CycleType) -> Self {
        self.cycle = Some(cycle);
        self
    }

    /// Sets the cycle from its name (`daily`, `weekly`, ...).
    #[must_use]
    pub fn cycle_name(mut self, name: &str) -> Self {
        match name.parse() {
            Ok(cycle) => self.cycle = Some(cycle),
            Err(e) => self.fail(e),
        }
        self
    }

    #[must_use]
    pub fn pattern(mut self, pattern: PatternType) -> Self {
        self.pattern = pattern;
        self
    }

    /// Sets the pattern from its name (`daynumber`, `weekday`, ...).
    #[must_use]
    pub fn pattern_name(mut self, name: &str) -> Self {
        match name.parse() {
            Ok(pattern) => self.pattern = pattern,
            Err(e) => self.fail(e),
        }
        self
    }

    /// Sets the step between anchors; 0 means 1.
    #[must_use]
    pub fn interval(mut self, interval: u32) -> Self {
        self.interval = interval.max(1);
        self
    }

    #[must_use]
    pub fn day_numbers(mut self, day_numbers: impl IntoIterator<Item = i32>) -> Self {
        self.day_numbers = day_numbers.into_iter().collect();
        self
    }

    #[must_use]
    pub fn weekdays<S: Into<String>>(mut self, weekdays: impl IntoIterator<Item = S>) -> Self {
        self.weekdays = weekdays.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn months<S: Into<String>>(mut self, months: impl IntoIterator<Item = S>) -> Self {
        self.months = months.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn range(mut self, range: Range) -> Self {
        self.range = range;
        self
    }

    /// Limits the series to a number of cycle iterations.
    #[must_use]
    pub fn count(self, limit: u32) -> Self {
        self.range(Range::Count(limit))
    }

    /// Limits the series to anchors up to one day past `until`.
    #[must_use]
    pub fn until(self, until: DateTime<Utc>) -> Self {
        self.range(Range::Until(until))
    }

    /// Adds one excluded calendar date.
    #[must_use]
    pub fn exclude(mut self, date: NaiveDate) -> Self {
        self.exclusions.insert(date);
        self
    }

    #[must_use]
    pub fn exclusions(mut self, dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.exclusions.extend(dates);
        self
    }

    /// Finishes the rule.
    ///
    /// # Errors
    ///
    /// Returns the first name that failed to parse, [`RuleError::MissingCycle`]
    /// if no cycle was set, or [`RuleError::EndBeforeStart`] for a negative
    /// duration.
    pub fn build(self) -> RuleResult<RecurrenceRule> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let cycle = self.cycle.ok_or(RuleError::MissingCycle)?;
        if self.initial_end < self.initial_start {
            return Err(RuleError::EndBeforeStart {
                start: self.initial_start,
                end: self.initial_end,
            });
        }

        Ok(RecurrenceRule {
            initial_start: self.initial_start,
            initial_end: self.initial_end,
            cycle,
            pattern: self.pattern,
            interval: self.interval,
            day_numbers: self.day_numbers,
            weekdays: self.weekdays,
            months: self.months,
            range: self.range,
            exclusions: self.exclusions,
        })
    }
}
