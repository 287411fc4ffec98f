//! The recurrence expansion engine.
//!
//! [`Expander::expand`] walks a rule's cycle anchors forward from the first
//! one, computes each anchor's candidate dates, and hands every accepted
//! candidate to an [`OccurrenceSink`]. The walk ends when an anchor reaches
//! the end of the query window or the rule's range is exhausted.
//!
//! Two historical quirks are selectable through [`ExpandOptions`]:
//! [`CandidatePolicy::SkipRest`] abandons an anchor's remaining candidates
//! after the first rejection, and [`CountPolicy::Inclusive`] permits one
//! iteration more than the rule's count. [`ExpandOptions::legacy`] enables
//! both and reproduces older free/busy output exactly.

use std::fmt;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span, trace, warn};

use crate::calendar;
use crate::names;
use crate::rule::{CycleType, PatternType, Range, RecurrenceRule};
use crate::sink::{Occurrence, OccurrenceSink};

/// What happens to an anchor's remaining candidates after one is rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidatePolicy {
    /// Skip the rejected candidate and keep going. Candidates are evaluated
    /// in chronological order with duplicates removed.
    #[default]
    SkipOne,
    /// Stop evaluating the anchor at the first rejection. Candidates are
    /// evaluated in the order the rule lists them; one that ended before the
    /// window opened is passed over, not treated as a rejection.
    SkipRest,
}

/// How [`Range::Count`] is read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountPolicy {
    /// `Count(n)` permits exactly `n` iterations.
    #[default]
    Exact,
    /// `Count(n)` permits iterations `0..=n`, that is `n + 1` of them.
    Inclusive,
}

/// Behavioural switches for the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpandOptions {
    pub candidates: CandidatePolicy,
    pub count: CountPolicy,
}

impl ExpandOptions {
    /// Options that reproduce the historical output bit for bit.
    pub fn legacy() -> Self {
        Self {
            candidates: CandidatePolicy::SkipRest,
            count: CountPolicy::Inclusive,
        }
    }

    pub fn is_legacy(&self) -> bool {
        *self == Self::legacy()
    }
}

/// A recoverable problem noticed while expanding a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A weekday selector did not name a weekday; its candidates were skipped.
    UnknownWeekday(String),
    /// A month selector did not name a month; its candidates were skipped.
    UnknownMonth(String),
    /// The pattern has no meaning for the cycle; nothing was produced.
    UnsupportedPattern {
        cycle: CycleType,
        pattern: PatternType,
    },
    /// A weekly rule without weekdays; nothing was produced.
    NoWeekdays,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownWeekday(name) => write!(f, "unknown weekday `{name}`"),
            Self::UnknownMonth(name) => write!(f, "unknown month `{name}`"),
            Self::UnsupportedPattern { cycle, pattern } => {
                write!(f, "pattern `{pattern}` is not supported for {cycle} rules")
            }
            Self::NoWeekdays => f.write_str("weekly rule has no weekdays"),
        }
    }
}

/// Summary of one expansion call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExpandReport {
    /// Anchor iterations the range admitted and the engine evaluated.
    pub iterations: u32,
    /// Occurrences handed to the sink.
    pub emitted: usize,
    /// Each distinct problem, once, in the order it was noticed.
    pub diagnostics: Vec<Diagnostic>,
}

impl ExpandReport {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    fn note(&mut self, diagnostic: Diagnostic) {
        if !self.diagnostics.contains(&diagnostic) {
            warn!(%diagnostic, "Recurrence rule problem");
            self.diagnostics.push(diagnostic);
        }
    }
}

/// Expands recurrence rules with a fixed set of [`ExpandOptions`].
///
/// An `Expander` holds no per-call state and can be shared between threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct Expander {
    options: ExpandOptions,
}

impl Expander {
    pub fn new(options: ExpandOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> ExpandOptions {
        self.options
    }

    /// Emits every occurrence of `rule` that overlaps `[window_start, window_end)`.
    ///
    /// The sink receives each occurrence's start and the rule's duration. With
    /// [`CandidatePolicy::SkipOne`] starts arrive in strictly increasing order.
    pub fn expand<S>(
        &self,
        rule: &RecurrenceRule,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        sink: &mut S,
    ) -> ExpandReport
    where
        S: OccurrenceSink + ?Sized,
    {
        let span = debug_span!(
            "expand",
            cycle = %rule.cycle(),
            pattern = %rule.pattern(),
            %window_start,
            %window_end,
        );
        let _enter = span.enter();

        let mut report = ExpandReport::default();
        let Some(selectors) = Selectors::resolve(rule, &mut report) else {
            return report;
        };
        let Some(first) = first_anchor(rule) else {
            return report;
        };

        let mut pass = Pass {
            rule,
            time: rule.initial_start().time(),
            duration: rule.duration(),
            window_start,
            window_end,
            sink,
            report,
        };

        let mut iteration = self.first_useful_iteration(rule, first, window_start);
        loop {
            if !self.range_admits(rule.range(), iteration) {
                break;
            }
            let Some(anchor_date) = anchor(first, rule.cycle(), rule.interval(), iteration) else {
                break;
            };
            let anchor_start = calendar::at_time(anchor_date, pass.time);
            if anchor_start >= window_end || past_until(rule.range(), anchor_start) {
                break;
            }

            pass.report.iterations += 1;
            let candidates = selectors.candidates(rule, anchor_date);
            trace!(%anchor_start, candidates = candidates.len(), "Anchor");
            match self.options.candidates {
                CandidatePolicy::SkipOne => pass.skip_one(candidates),
                CandidatePolicy::SkipRest => pass.skip_rest(candidates),
            }

            let Some(next) = iteration.checked_add(1) else {
                break;
            };
            iteration = next;
        }

        debug!(
            iterations = pass.report.iterations,
            emitted = pass.report.emitted,
            "Expansion finished"
        );
        pass.report
    }

    /// Collects the occurrences of `rule` in the window.
    pub fn occurrences(
        &self,
        rule: &RecurrenceRule,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Vec<Occurrence> {
        let mut occurrences = Vec::new();
        self.expand(
            rule,
            window_start,
            window_end,
            &mut |start: DateTime<Utc>, duration: Duration| {
                occurrences.push(Occurrence::new(start, duration));
            },
        );
        occurrences
    }

    /// The first occurrence starting at or after `after`, looking no further
    /// than `after + horizon`.
    pub fn next_occurrence(
        &self,
        rule: &RecurrenceRule,
        after: DateTime<Utc>,
        horizon: Duration,
    ) -> Option<Occurrence> {
        let until = after
            .checked_add_signed(horizon)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let mut next: Option<Occurrence> = None;
        self.expand(
            rule,
            after,
            until,
            &mut |start: DateTime<Utc>, duration: Duration| {
                if start >= after && next.is_none_or(|found| start < found.start) {
                    next = Some(Occurrence::new(start, duration));
                }
            },
        );
        next
    }

    fn range_admits(&self, range: Range, iteration: u32) -> bool {
        match (range, self.options.count) {
            (Range::Count(limit), CountPolicy::Exact) => iteration < limit,
            (Range::Count(limit), CountPolicy::Inclusive) => iteration <= limit,
            (Range::Until(_) | Range::Unbounded, _) => true,
        }
    }

    /// Index of the first anchor whose candidates can reach the window.
    ///
    /// Counted ranges always start at 0 because every iteration counts
    /// towards the limit.
    fn first_useful_iteration(
        &self,
        rule: &RecurrenceRule,
        first: NaiveDate,
        window_start: DateTime<Utc>,
    ) -> u32 {
        if matches!(rule.range(), Range::Count(_)) {
            return 0;
        }
        let Some(earliest) = window_start.checked_sub_signed(rule.duration()) else {
            return 0;
        };
        let target = calendar::civil_date(earliest);
        if target <= first {
            return 0;
        }

        let interval = i64::from(rule.interval());
        let units = match rule.cycle() {
            CycleType::Daily => (target - first).num_days(),
            CycleType::Weekly => (target - first).num_days() / 7,
            CycleType::Monthly => {
                i64::from(target.year() - first.year()) * 12 + i64::from(target.month())
                    - i64::from(first.month())
            }
            CycleType::Yearly => i64::from(target.year() - first.year()),
        };
        // anchors before this one end before the window opens
        u32::try_from(units / interval - 1).unwrap_or(0)
    }
}

/// Expands `rule` with default options.
pub fn expand<S>(
    rule: &RecurrenceRule,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    sink: &mut S,
) -> ExpandReport
where
    S: OccurrenceSink + ?Sized,
{
    Expander::default().expand(rule, window_start, window_end, sink)
}

fn first_anchor(rule: &RecurrenceRule) -> Option<NaiveDate> {
    let date = calendar::civil_date(rule.initial_start());
    match rule.cycle() {
        CycleType::Daily => Some(date),
        CycleType::Weekly => calendar::start_of_week(date),
        CycleType::Monthly => Some(calendar::start_of_month(date)),
        CycleType::Yearly => Some(calendar::start_of_year(date)),
    }
}

fn anchor(first: NaiveDate, cycle: CycleType, interval: u32, iteration: u32) -> Option<NaiveDate> {
    let steps = iteration.checked_mul(interval)?;
    match cycle {
        CycleType::Daily => calendar::add_days(first, u64::from(steps)),
        CycleType::Weekly => calendar::add_days(first, u64::from(steps) * 7),
        CycleType::Monthly => calendar::add_months(first, steps),
        CycleType::Yearly => calendar::add_years(first, steps),
    }
}

fn past_until(range: Range, anchor: DateTime<Utc>) -> bool {
    match range {
        Range::Until(until) => until
            .checked_add_signed(Duration::days(1))
            .is_some_and(|limit| anchor > limit),
        Range::Count(_) | Range::Unbounded => false,
    }
}

/// Positional partner lookup: `list[i]`, or the last entry when `list` is
/// shorter. `None` when the list is empty.
fn partner<T: Copy>(list: &[T], i: usize) -> Option<T> {
    list.get(i).or(list.last()).copied()
}

/// Weekday and month selectors resolved once per call.
///
/// `None` entries are names that did not resolve; their candidates are
/// dropped without counting as a rejection.
struct Selectors {
    weekdays: Vec<Option<u32>>,
    months: Vec<Option<u32>>,
}

impl Selectors {
    /// Resolves the selectors `rule` uses, or `None` when the rule cannot
    /// produce anything.
    fn resolve(rule: &RecurrenceRule, report: &mut ExpandReport) -> Option<Self> {
        let cycle = rule.cycle();
        let pattern = rule.pattern();

        match (cycle, pattern) {
            (CycleType::Monthly, PatternType::YearDay) => {
                report.note(Diagnostic::UnsupportedPattern { cycle, pattern });
                return None;
            }
            (CycleType::Weekly, _) if rule.weekdays().is_empty() => {
                report.note(Diagnostic::NoWeekdays);
                return None;
            }
            _ => {}
        }

        let uses_weekdays = cycle == CycleType::Weekly
            || (cycle != CycleType::Daily && pattern == PatternType::WeekdayOrdinal);
        let uses_months = cycle == CycleType::Yearly
            && matches!(pattern, PatternType::MonthDay | PatternType::WeekdayOrdinal);

        let mut weekdays = Vec::new();
        if uses_weekdays {
            for name in rule.weekdays() {
                let index = names::weekday_index(name);
                if index.is_none() {
                    report.note(Diagnostic::UnknownWeekday(name.clone()));
                }
                weekdays.push(index);
            }
        }

        let mut months = Vec::new();
        if uses_months {
            for name in rule.months() {
                let index = names::month_index(name);
                if index.is_none() {
                    report.note(Diagnostic::UnknownMonth(name.clone()));
                }
                months.push(index);
            }
        }

        Some(Self { weekdays, months })
    }

    /// Candidate dates for one anchor, in the order the rule lists them.
    ///
    /// A `None` entry is a selector with no date in the anchor's period (the
    /// 31st of a short month, a missing fifth weekday) and counts as a
    /// rejection.
    fn candidates(&self, rule: &RecurrenceRule, anchor: NaiveDate) -> Vec<Option<NaiveDate>> {
        let year = anchor.year();
        let month = anchor.month();
        let days = rule.day_numbers();

        match (rule.cycle(), rule.pattern()) {
            (CycleType::Daily, _) => vec![Some(anchor)],
            (CycleType::Weekly, _) => self
                .weekdays
                .iter()
                .flatten()
                .map(|&weekday| calendar::add_days(anchor, u64::from(weekday)))
                .collect(),
            (CycleType::Monthly, PatternType::DayNumber | PatternType::MonthDay) => days
                .iter()
                .map(|&n| calendar::nth_day_of_month(year, month, n))
                .collect(),
            (CycleType::Monthly, PatternType::WeekdayOrdinal) => days
                .iter()
                .enumerate()
                .filter_map(|(i, &n)| {
                    let weekday = partner(&self.weekdays, i)??;
                    Some(calendar::nth_weekday_of_month(year, month, weekday, n))
                })
                .collect(),
            (CycleType::Monthly, PatternType::YearDay) => Vec::new(),
            (CycleType::Yearly, PatternType::DayNumber | PatternType::YearDay) => days
                .iter()
                .map(|&n| calendar::nth_day_of_year(year, n))
                .collect(),
            (CycleType::Yearly, PatternType::MonthDay) => days
                .iter()
                .enumerate()
                .filter_map(|(i, &n)| {
                    let month = partner(&self.months, i)??;
                    Some(calendar::nth_day_of_month(year, month, n))
                })
                .collect(),
            (CycleType::Yearly, PatternType::WeekdayOrdinal) => days
                .iter()
                .enumerate()
                .filter_map(|(i, &n)| {
                    let weekday = partner(&self.weekdays, i)??;
                    let month = partner(&self.months, i)??;
                    Some(calendar::nth_weekday_of_month(year, month, weekday, n))
                })
                .collect(),
        }
    }
}

/// State for one `expand` call.
struct Pass<'a, S: ?Sized> {
    rule: &'a RecurrenceRule,
    time: NaiveTime,
    duration: Duration,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    sink: &'a mut S,
    report: ExpandReport,
}

/// What the emission test says about one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Emit,
    /// Ends before the window opens. Never ends a skip-rest anchor, so the
    /// result does not depend on where the window starts.
    BeforeWindow,
    Reject,
}

impl<S: OccurrenceSink + ?Sized> Pass<'_, S> {
    fn skip_one(&mut self, candidates: Vec<Option<NaiveDate>>) {
        let mut dates: Vec<NaiveDate> = candidates.into_iter().flatten().collect();
        dates.sort_unstable();
        dates.dedup();
        for date in dates {
            let start = calendar::at_time(date, self.time);
            if self.verdict(start) == Verdict::Emit {
                self.emit(start);
            }
        }
    }

    fn skip_rest(&mut self, candidates: Vec<Option<NaiveDate>>) {
        for candidate in candidates {
            let Some(date) = candidate else {
                trace!("Candidate outside its period, dropping the rest of the anchor");
                break;
            };
            let start = calendar::at_time(date, self.time);
            match self.verdict(start) {
                Verdict::Emit => self.emit(start),
                Verdict::BeforeWindow => {}
                Verdict::Reject => break,
            }
        }
    }

    fn verdict(&self, start: DateTime<Utc>) -> Verdict {
        if start < self.rule.initial_start() {
            trace!(%start, "Before series start");
            return Verdict::Reject;
        }
        if start >= self.window_end {
            trace!(%start, "After window end");
            return Verdict::Reject;
        }
        let Some(end) = start.checked_add_signed(self.duration) else {
            return Verdict::Reject;
        };
        if self.rule.is_excluded(start, end) {
            trace!(%start, "Excluded date");
            return Verdict::Reject;
        }
        if end <= self.window_start && start < self.window_start {
            trace!(%start, "Before window start");
            return Verdict::BeforeWindow;
        }
        Verdict::Emit
    }

    fn emit(&mut self, start: DateTime<Utc>) {
        trace!(%start, "Occurrence");
        self.sink.record(start, self.duration);
        self.report.emitted += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn hour_at(y: i32, m: u32, d: u32) -> crate::rule::RuleBuilder {
        RecurrenceRule::builder(utc(y, m, d, 9, 0, 0), utc(y, m, d, 10, 0, 0))
    }

    fn starts(occurrences: &[Occurrence]) -> Vec<DateTime<Utc>> {
        occurrences.iter().map(|o| o.start).collect()
    }

    fn at_nine(dates: &[(i32, u32, u32)]) -> Vec<DateTime<Utc>> {
        dates.iter().map(|&(y, m, d)| utc(y, m, d, 9, 0, 0)).collect()
    }

    fn corrected() -> Expander {
        Expander::default()
    }

    fn legacy() -> Expander {
        Expander::new(ExpandOptions::legacy())
    }

    fn render(occurrences: &[Occurrence]) -> String {
        occurrences
            .iter()
            .map(|o| format!("{} {}m", o.start.format("%Y-%m-%d %H:%M"), o.duration.num_minutes()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    mod daily {
        use super::*;

        #[test]
        fn every_other_day() {
            let rule = hour_at(2024, 1, 1)
                .cycle(CycleType::Daily)
                .interval(2)
                .build()
                .unwrap();
            let occurrences =
                corrected().occurrences(&rule, utc(2024, 1, 1, 0, 0, 0), utc(2024, 1, 10, 0, 0, 0));

            assert_eq!(
                starts(&occurrences),
                at_nine(&[(2024, 1, 1), (2024, 1, 3), (2024, 1, 5), (2024, 1, 7), (2024, 1, 9)])
            );
            assert!(occurrences.iter().all(|o| o.duration == Duration::hours(1)));
        }

        #[test]
        fn occurrence_straddling_window_start_is_emitted() {
            let rule = RecurrenceRule::builder(utc(2024, 1, 1, 23, 0, 0), utc(2024, 1, 2, 1, 0, 0))
                .cycle(CycleType::Daily)
                .build()
                .unwrap();
            let occurrences =
                corrected().occurrences(&rule, utc(2024, 1, 2, 0, 0, 0), utc(2024, 1, 3, 0, 0, 0));

            assert_eq!(
                starts(&occurrences),
                vec![utc(2024, 1, 1, 23, 0, 0), utc(2024, 1, 2, 23, 0, 0)]
            );
        }

        #[test]
        fn zero_length_occurrence_at_window_start() {
            let at = utc(2024, 1, 1, 0, 0, 0);
            let rule = RecurrenceRule::builder(at, at)
                .cycle(CycleType::Daily)
                .build()
                .unwrap();
            let occurrences =
                corrected().occurrences(&rule, utc(2024, 1, 2, 0, 0, 0), utc(2024, 1, 3, 0, 0, 0));
            assert_eq!(starts(&occurrences), vec![utc(2024, 1, 2, 0, 0, 0)]);
        }

        #[test]
        fn nothing_before_series_start() {
            let rule = hour_at(2024, 1, 5).cycle(CycleType::Daily).build().unwrap();
            let occurrences =
                corrected().occurrences(&rule, utc(2024, 1, 1, 0, 0, 0), utc(2024, 1, 4, 0, 0, 0));
            assert!(occurrences.is_empty());
        }

        #[test]
        fn distant_window_of_unbounded_rule() {
            let rule = hour_at(2020, 1, 1)
                .cycle(CycleType::Daily)
                .interval(3)
                .build()
                .unwrap();
            let occurrences =
                corrected().occurrences(&rule, utc(2024, 3, 1, 0, 0, 0), utc(2024, 3, 8, 0, 0, 0));
            assert_eq!(
                starts(&occurrences),
                at_nine(&[(2024, 3, 1), (2024, 3, 4), (2024, 3, 7)])
            );
        }
    }

    mod weekly {
        use super::*;

        fn mon_wed() -> crate::rule::RuleBuilder {
            hour_at(2024, 1, 1)
                .cycle(CycleType::Weekly)
                .weekdays(["monday", "wednesday"])
        }

        fn january() -> (DateTime<Utc>, DateTime<Utc>) {
            (utc(2024, 1, 1, 0, 0, 0), utc(2024, 2, 1, 0, 0, 0))
        }

        #[test]
        fn both_weekdays_every_week() {
            let rule = mon_wed().build().unwrap();
            let (from, to) = january();
            let occurrences = corrected().occurrences(&rule, from, to);
            assert_eq!(occurrences.len(), 10);
            assert_eq!(occurrences[0].start, utc(2024, 1, 1, 9, 0, 0));
            assert_eq!(occurrences[9].start, utc(2024, 1, 31, 9, 0, 0));
        }

        #[test]
        fn excluded_wednesday_keeps_its_monday() {
            let rule = mon_wed().exclude(date(2024, 1, 10)).build().unwrap();
            let (from, to) = january();

            for expander in [corrected(), legacy()] {
                let occurrences = expander.occurrences(&rule, from, to);
                let found = starts(&occurrences);
                assert_eq!(found.len(), 9);
                assert!(!found.contains(&utc(2024, 1, 10, 9, 0, 0)));
                assert!(found.contains(&utc(2024, 1, 8, 9, 0, 0)));
            }
        }

        #[test]
        fn excluded_monday_under_each_policy() {
            let rule = mon_wed().exclude(date(2024, 1, 8)).build().unwrap();
            let (from, to) = january();

            let found = starts(&corrected().occurrences(&rule, from, to));
            assert_eq!(found.len(), 9);
            assert!(found.contains(&utc(2024, 1, 10, 9, 0, 0)));

            // the rejected Monday ends that week's iteration
            let found = starts(&legacy().occurrences(&rule, from, to));
            assert_eq!(found.len(), 8);
            assert!(!found.contains(&utc(2024, 1, 10, 9, 0, 0)));
        }

        #[test]
        fn legacy_drops_weekdays_listed_after_the_excluded_one() {
            let rule = hour_at(2024, 1, 1)
                .cycle(CycleType::Weekly)
                .weekdays(["wednesday", "monday"])
                .exclude(date(2024, 1, 10))
                .build()
                .unwrap();
            let (from, to) = january();

            let found = starts(&legacy().occurrences(&rule, from, to));
            assert!(!found.contains(&utc(2024, 1, 10, 9, 0, 0)));
            assert!(!found.contains(&utc(2024, 1, 8, 9, 0, 0)));
            assert_eq!(found.len(), 8);

            let found = starts(&corrected().occurrences(&rule, from, to));
            assert!(found.contains(&utc(2024, 1, 8, 9, 0, 0)));
            assert_eq!(found.len(), 9);
        }

        #[test]
        fn legacy_loses_first_week_when_series_starts_midweek() {
            let rule = hour_at(2024, 1, 3)
                .cycle(CycleType::Weekly)
                .weekdays(["monday", "wednesday"])
                .build()
                .unwrap();
            let from = utc(2024, 1, 1, 0, 0, 0);
            let to = utc(2024, 1, 8, 0, 0, 0);

            assert_eq!(
                starts(&corrected().occurrences(&rule, from, to)),
                at_nine(&[(2024, 1, 3)])
            );
            assert!(legacy().occurrences(&rule, from, to).is_empty());
        }

        #[test]
        fn legacy_keeps_friday_when_window_opens_midweek() {
            let rule = hour_at(2024, 1, 1)
                .cycle(CycleType::Weekly)
                .weekdays(["monday", "friday"])
                .build()
                .unwrap();
            // Wednesday; that week's Monday ended before the window
            let from = utc(2024, 1, 10, 0, 0, 0);
            let to = utc(2024, 1, 20, 0, 0, 0);

            assert_eq!(
                starts(&legacy().occurrences(&rule, from, to)),
                at_nine(&[(2024, 1, 12), (2024, 1, 15), (2024, 1, 19)])
            );
        }

        #[test]
        fn interval_skips_weeks() {
            let rule = hour_at(2024, 1, 1)
                .cycle(CycleType::Weekly)
                .interval(2)
                .weekdays(["MO"])
                .build()
                .unwrap();
            let (from, to) = january();
            assert_eq!(
                starts(&corrected().occurrences(&rule, from, to)),
                at_nine(&[(2024, 1, 1), (2024, 1, 15), (2024, 1, 29)])
            );
        }

        #[test]
        fn count_limits_weeks_not_occurrences() {
            let rule = mon_wed().count(2).build().unwrap();
            let (from, to) = january();

            let mut report_count = 0;
            let report = corrected().expand(&rule, from, to, &mut |_: DateTime<Utc>, _: Duration| {
                report_count += 1;
            });
            assert_eq!(report.iterations, 2);
            assert_eq!(report_count, 4);
            assert_eq!(report.emitted, 4);
        }

        #[test]
        fn no_weekdays_is_reported() {
            let rule = hour_at(2024, 1, 1).cycle(CycleType::Weekly).build().unwrap();
            let (from, to) = january();
            let report =
                corrected().expand(&rule, from, to, &mut |_: DateTime<Utc>, _: Duration| {});
            assert_eq!(report.emitted, 0);
            assert_eq!(report.diagnostics, vec![Diagnostic::NoWeekdays]);
        }
    }

    mod monthly {
        use super::*;

        #[test]
        fn second_tuesday() {
            let rule = hour_at(2024, 1, 9)
                .cycle(CycleType::Monthly)
                .pattern(PatternType::WeekdayOrdinal)
                .day_numbers([2])
                .weekdays(["tuesday"])
                .build()
                .unwrap();
            let occurrences =
                corrected().occurrences(&rule, utc(2024, 1, 1, 0, 0, 0), utc(2024, 7, 1, 0, 0, 0));

            insta::assert_snapshot!(render(&occurrences), @r"
            2024-01-09 09:00 60m
            2024-02-13 09:00 60m
            2024-03-12 09:00 60m
            2024-04-09 09:00 60m
            2024-05-14 09:00 60m
            2024-06-11 09:00 60m
            ");
        }

        #[test]
        fn last_friday() {
            let rule = hour_at(2024, 5, 31)
                .cycle(CycleType::Monthly)
                .pattern(PatternType::WeekdayOrdinal)
                .day_numbers([-1])
                .weekdays(["friday"])
                .build()
                .unwrap();
            let occurrences =
                corrected().occurrences(&rule, utc(2024, 5, 1, 0, 0, 0), utc(2024, 8, 1, 0, 0, 0));
            assert_eq!(
                starts(&occurrences),
                at_nine(&[(2024, 5, 31), (2024, 6, 28), (2024, 7, 26)])
            );
        }

        #[test]
        fn thirty_first_skips_short_months() {
            let rule = hour_at(2024, 1, 31)
                .cycle(CycleType::Monthly)
                .day_numbers([31])
                .build()
                .unwrap();
            let occurrences =
                corrected().occurrences(&rule, utc(2024, 1, 1, 0, 0, 0), utc(2024, 6, 1, 0, 0, 0));
            assert_eq!(
                starts(&occurrences),
                at_nine(&[(2024, 1, 31), (2024, 3, 31), (2024, 5, 31)])
            );
        }

        #[test]
        fn several_days_under_each_policy() {
            let rule = hour_at(2024, 1, 1)
                .cycle(CycleType::Monthly)
                .day_numbers([31, 15])
                .build()
                .unwrap();
            let from = utc(2024, 1, 1, 0, 0, 0);
            let to = utc(2024, 3, 1, 0, 0, 0);

            assert_eq!(
                starts(&corrected().occurrences(&rule, from, to)),
                at_nine(&[(2024, 1, 15), (2024, 1, 31), (2024, 2, 15)])
            );
            // listed order, and February stops at its missing 31st
            assert_eq!(
                starts(&legacy().occurrences(&rule, from, to)),
                at_nine(&[(2024, 1, 31), (2024, 1, 15)])
            );
        }

        #[test]
        fn year_day_pattern_is_unsupported() {
            let rule = hour_at(2024, 1, 1)
                .cycle(CycleType::Monthly)
                .pattern(PatternType::YearDay)
                .day_numbers([100])
                .build()
                .unwrap();
            let report = corrected().expand(
                &rule,
                utc(2024, 1, 1, 0, 0, 0),
                utc(2025, 1, 1, 0, 0, 0),
                &mut |_: DateTime<Utc>, _: Duration| {},
            );
            assert_eq!(report.emitted, 0);
            assert_eq!(
                report.diagnostics,
                vec![Diagnostic::UnsupportedPattern {
                    cycle: CycleType::Monthly,
                    pattern: PatternType::YearDay,
                }]
            );
        }
    }

    mod yearly {
        use super::*;

        #[test]
        fn christmas() {
            let rule = hour_at(2024, 12, 25)
                .cycle(CycleType::Yearly)
                .pattern(PatternType::MonthDay)
                .day_numbers([25])
                .months(["december"])
                .build()
                .unwrap();
            let occurrences =
                corrected().occurrences(&rule, utc(2024, 1, 1, 0, 0, 0), utc(2027, 1, 1, 0, 0, 0));
            assert_eq!(
                starts(&occurrences),
                at_nine(&[(2024, 12, 25), (2025, 12, 25), (2026, 12, 25)])
            );
        }

        #[test]
        fn count_under_each_policy() {
            let rule = hour_at(2024, 12, 25)
                .cycle(CycleType::Yearly)
                .pattern(PatternType::MonthDay)
                .day_numbers([25])
                .months(["12"])
                .count(2)
                .build()
                .unwrap();
            let from = utc(2024, 1, 1, 0, 0, 0);
            let to = utc(2030, 1, 1, 0, 0, 0);

            assert_eq!(corrected().occurrences(&rule, from, to).len(), 2);
            assert_eq!(legacy().occurrences(&rule, from, to).len(), 3);
        }

        #[test]
        fn leap_day_only_in_leap_years() {
            let rule = hour_at(2024, 2, 29)
                .cycle(CycleType::Yearly)
                .pattern(PatternType::MonthDay)
                .day_numbers([29])
                .months(["february"])
                .build()
                .unwrap();
            let occurrences =
                corrected().occurrences(&rule, utc(2024, 1, 1, 0, 0, 0), utc(2029, 1, 1, 0, 0, 0));
            assert_eq!(starts(&occurrences), at_nine(&[(2024, 2, 29), (2028, 2, 29)]));
        }

        #[test]
        fn fourth_thursday_of_november() {
            let rule = hour_at(2024, 11, 28)
                .cycle(CycleType::Yearly)
                .pattern(PatternType::WeekdayOrdinal)
                .day_numbers([4])
                .weekdays(["thursday"])
                .months(["november"])
                .build()
                .unwrap();
            let occurrences =
                corrected().occurrences(&rule, utc(2024, 1, 1, 0, 0, 0), utc(2027, 1, 1, 0, 0, 0));
            assert_eq!(
                starts(&occurrences),
                at_nine(&[(2024, 11, 28), (2025, 11, 27), (2026, 11, 26)])
            );
        }

        #[test]
        fn first_and_last_day_of_year() {
            let rule = RecurrenceRule::builder(utc(2024, 1, 1, 0, 0, 0), utc(2024, 1, 1, 1, 0, 0))
                .cycle(CycleType::Yearly)
                .pattern(PatternType::YearDay)
                .day_numbers([1, -1])
                .build()
                .unwrap();
            let occurrences =
                corrected().occurrences(&rule, utc(2024, 1, 1, 0, 0, 0), utc(2025, 1, 2, 0, 0, 0));
            assert_eq!(
                starts(&occurrences),
                vec![
                    utc(2024, 1, 1, 0, 0, 0),
                    utc(2024, 12, 31, 0, 0, 0),
                    utc(2025, 1, 1, 0, 0, 0),
                ]
            );
        }

        #[test]
        fn shorter_month_list_reuses_last_month() {
            let rule = hour_at(2024, 3, 1)
                .cycle(CycleType::Yearly)
                .pattern(PatternType::MonthDay)
                .day_numbers([1, 15])
                .months(["march"])
                .build()
                .unwrap();
            let occurrences =
                corrected().occurrences(&rule, utc(2024, 1, 1, 0, 0, 0), utc(2025, 1, 1, 0, 0, 0));
            assert_eq!(starts(&occurrences), at_nine(&[(2024, 3, 1), (2024, 3, 15)]));
        }
    }

    mod ranges {
        use super::*;

        #[test]
        fn until_admits_anchors_up_to_a_day_later() {
            let rule = hour_at(2024, 1, 1)
                .cycle(CycleType::Daily)
                .until(utc(2024, 1, 3, 0, 0, 0))
                .build()
                .unwrap();
            let occurrences =
                corrected().occurrences(&rule, utc(2024, 1, 1, 0, 0, 0), utc(2024, 1, 31, 0, 0, 0));
            assert_eq!(
                starts(&occurrences),
                at_nine(&[(2024, 1, 1), (2024, 1, 2), (2024, 1, 3)])
            );
        }

        #[test]
        fn count_is_measured_from_series_start() {
            let rule = hour_at(2024, 1, 1)
                .cycle(CycleType::Daily)
                .count(5)
                .build()
                .unwrap();
            let occurrences =
                corrected().occurrences(&rule, utc(2024, 1, 3, 0, 0, 0), utc(2024, 1, 31, 0, 0, 0));
            assert_eq!(
                starts(&occurrences),
                at_nine(&[(2024, 1, 3), (2024, 1, 4), (2024, 1, 5)])
            );
        }

        #[test]
        fn count_zero() {
            let rule = hour_at(2024, 1, 1)
                .cycle(CycleType::Daily)
                .count(0)
                .build()
                .unwrap();
            let from = utc(2024, 1, 1, 0, 0, 0);
            let to = utc(2024, 1, 31, 0, 0, 0);
            assert!(corrected().occurrences(&rule, from, to).is_empty());
            assert_eq!(legacy().occurrences(&rule, from, to).len(), 1);
        }

        #[test]
        fn unbounded_stops_at_window_end() {
            let rule = hour_at(2024, 1, 1).cycle(CycleType::Daily).build().unwrap();
            let report = corrected().expand(
                &rule,
                utc(2024, 1, 1, 0, 0, 0),
                utc(2024, 1, 11, 0, 0, 0),
                &mut |_: DateTime<Utc>, _: Duration| {},
            );
            assert_eq!(report.emitted, 10);
            assert_eq!(report.iterations, 10);
        }
    }

    mod properties {
        use super::*;

        fn sample_rules() -> Vec<RecurrenceRule> {
            vec![
                hour_at(2024, 1, 1).cycle(CycleType::Daily).interval(2).build().unwrap(),
                hour_at(2024, 1, 2)
                    .cycle(CycleType::Weekly)
                    .weekdays(["friday", "tuesday", "sunday"])
                    .exclusions([date(2024, 1, 5), date(2024, 2, 6)])
                    .build()
                    .unwrap(),
                hour_at(2024, 1, 1)
                    .cycle(CycleType::Monthly)
                    .day_numbers([1, -1, 15])
                    .exclude(date(2024, 2, 15))
                    .build()
                    .unwrap(),
                RecurrenceRule::builder(utc(2024, 1, 1, 22, 0, 0), utc(2024, 1, 3, 2, 0, 0))
                    .cycle(CycleType::Weekly)
                    .weekdays(["monday"])
                    .exclude(date(2024, 1, 16))
                    .build()
                    .unwrap(),
            ]
        }

        fn window() -> (DateTime<Utc>, DateTime<Utc>) {
            (utc(2024, 1, 10, 12, 0, 0), utc(2024, 3, 1, 0, 0, 0))
        }

        #[test]
        fn deterministic() {
            let (from, to) = window();
            for rule in sample_rules() {
                for expander in [corrected(), legacy()] {
                    assert_eq!(
                        expander.occurrences(&rule, from, to),
                        expander.occurrences(&rule, from, to)
                    );
                }
            }
        }

        #[test]
        fn same_occurrences_whatever_the_window_start() {
            let mut rules = sample_rules();
            rules.push(
                hour_at(2024, 1, 1)
                    .cycle(CycleType::Weekly)
                    .weekdays(["monday", "friday"])
                    .build()
                    .unwrap(),
            );
            rules.push(
                hour_at(2024, 1, 1)
                    .cycle(CycleType::Monthly)
                    .day_numbers([1, 15])
                    .build()
                    .unwrap(),
            );
            // mid-week, mid-month, inside a multi-day occurrence
            let starts = [
                utc(2024, 1, 3, 12, 0, 0),
                utc(2024, 1, 10, 0, 0, 0),
                utc(2024, 1, 16, 23, 0, 0),
                utc(2024, 2, 14, 0, 0, 0),
            ];
            let earliest = utc(2024, 1, 1, 0, 0, 0);
            let to = utc(2024, 3, 20, 0, 0, 0);

            for rule in &rules {
                for expander in [corrected(), legacy()] {
                    for from in starts {
                        let wide: Vec<_> = expander
                            .occurrences(rule, earliest, to)
                            .into_iter()
                            .filter(|o| o.start >= from || o.end() > from)
                            .collect();
                        assert_eq!(
                            expander.occurrences(rule, from, to),
                            wide,
                            "{:?} from {from}",
                            expander.options()
                        );
                    }
                }
            }
        }

        #[test]
        fn contained_in_window_with_constant_duration() {
            let (from, to) = window();
            for rule in sample_rules() {
                for occurrence in corrected().occurrences(&rule, from, to) {
                    assert!(occurrence.start < to);
                    assert!(occurrence.end() > from || occurrence.start >= from);
                    assert!(occurrence.start >= rule.initial_start());
                    assert_eq!(occurrence.duration, rule.duration());
                }
            }
        }

        #[test]
        fn strictly_increasing() {
            let (from, to) = window();
            for rule in sample_rules() {
                let found = starts(&corrected().occurrences(&rule, from, to));
                assert!(found.windows(2).all(|pair| pair[0] < pair[1]));
            }
        }

        #[test]
        fn exclusions_are_honoured() {
            let (from, to) = window();
            for rule in sample_rules() {
                for expander in [corrected(), legacy()] {
                    for occurrence in expander.occurrences(&rule, from, to) {
                        let first = occurrence.start.date_naive();
                        let last = occurrence.end().date_naive();
                        assert!(rule.exclusions().iter().all(|e| *e < first || *e > last));
                    }
                }
            }
        }

        #[test]
        fn multi_day_occurrence_blocked_by_any_covered_day() {
            let rule = &sample_rules()[3];
            let (from, to) = window();
            let found = starts(&corrected().occurrences(rule, from, to));
            // the 15th occurrence runs into the excluded 16th
            assert!(!found.contains(&utc(2024, 1, 15, 22, 0, 0)));
            assert!(found.contains(&utc(2024, 1, 22, 22, 0, 0)));
        }

        #[test]
        fn expansion_is_reentrant() {
            let rules = sample_rules();
            let (from, to) = window();
            let serial: Vec<Vec<Occurrence>> = rules
                .iter()
                .map(|rule| corrected().occurrences(rule, from, to))
                .collect();

            let expander = corrected();
            let parallel: Vec<Vec<Occurrence>> = std::thread::scope(|scope| {
                let handles: Vec<_> = rules
                    .iter()
                    .map(|rule| scope.spawn(move || expander.occurrences(rule, from, to)))
                    .collect();
                handles.into_iter().map(|h| h.join().unwrap()).collect()
            });
            assert_eq!(serial, parallel);
        }
    }

    mod diagnostics {
        use super::*;

        #[test]
        fn unknown_weekday_is_skipped_and_reported_once() {
            let rule = hour_at(2024, 1, 1)
                .cycle(CycleType::Weekly)
                .weekdays(["funday", "monday"])
                .build()
                .unwrap();
            let mut found = Vec::new();
            let report = legacy().expand(
                &rule,
                utc(2024, 1, 1, 0, 0, 0),
                utc(2024, 1, 22, 0, 0, 0),
                &mut |start: DateTime<Utc>, _: Duration| found.push(start),
            );

            assert_eq!(found, at_nine(&[(2024, 1, 1), (2024, 1, 8), (2024, 1, 15)]));
            assert_eq!(
                report.diagnostics,
                vec![Diagnostic::UnknownWeekday("funday".to_string())]
            );
            assert!(!report.is_clean());
        }

        #[test]
        fn unknown_month_is_skipped() {
            let rule = hour_at(2024, 1, 1)
                .cycle(CycleType::Yearly)
                .pattern(PatternType::MonthDay)
                .day_numbers([1, 4])
                .months(["smarch", "july"])
                .build()
                .unwrap();
            let mut found = Vec::new();
            let report = corrected().expand(
                &rule,
                utc(2024, 1, 1, 0, 0, 0),
                utc(2025, 1, 1, 0, 0, 0),
                &mut |start: DateTime<Utc>, _: Duration| found.push(start),
            );

            assert_eq!(found, at_nine(&[(2024, 7, 4)]));
            assert_eq!(
                report.diagnostics,
                vec![Diagnostic::UnknownMonth("smarch".to_string())]
            );
        }

        #[test]
        fn unused_selectors_are_not_checked() {
            let rule = hour_at(2024, 1, 1)
                .cycle(CycleType::Daily)
                .weekdays(["funday"])
                .months(["smarch"])
                .build()
                .unwrap();
            let report = corrected().expand(
                &rule,
                utc(2024, 1, 1, 0, 0, 0),
                utc(2024, 1, 2, 0, 0, 0),
                &mut |_: DateTime<Utc>, _: Duration| {},
            );
            assert!(report.is_clean());
            assert_eq!(report.emitted, 1);
        }

        #[test]
        fn display() {
            let diagnostic = Diagnostic::UnsupportedPattern {
                cycle: CycleType::Monthly,
                pattern: PatternType::YearDay,
            };
            assert_eq!(
                diagnostic.to_string(),
                "pattern `yearday` is not supported for monthly rules"
            );
        }
    }

    mod next {
        use super::*;

        fn mon_wed() -> RecurrenceRule {
            hour_at(2024, 1, 1)
                .cycle(CycleType::Weekly)
                .weekdays(["wednesday", "monday"])
                .build()
                .unwrap()
        }

        #[test]
        fn finds_following_occurrence() {
            let next = corrected()
                .next_occurrence(&mon_wed(), utc(2024, 1, 4, 0, 0, 0), Duration::days(30))
                .unwrap();
            assert_eq!(next.start, utc(2024, 1, 8, 9, 0, 0));
            assert_eq!(next.end(), utc(2024, 1, 8, 10, 0, 0));
        }

        #[test]
        fn skips_occurrence_already_in_progress() {
            let next = legacy()
                .next_occurrence(&mon_wed(), utc(2024, 1, 3, 9, 30, 0), Duration::days(30))
                .unwrap();
            assert_eq!(next.start, utc(2024, 1, 8, 9, 0, 0));
        }

        #[test]
        fn none_past_the_end_of_the_series() {
            let rule = hour_at(2024, 1, 1)
                .cycle(CycleType::Daily)
                .count(1)
                .build()
                .unwrap();
            assert!(
                corrected()
                    .next_occurrence(&rule, utc(2024, 1, 2, 0, 0, 0), Duration::days(365))
                    .is_none()
            );
        }
    }

    #[test]
    fn options_from_json() {
        let options: ExpandOptions =
            serde_json::from_str(r#"{"candidates":"skip_rest","count":"inclusive"}"#).unwrap();
        assert!(options.is_legacy());

        let options: ExpandOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, ExpandOptions::default());
    }

    #[test]
    fn free_function_uses_default_options() {
        let rule = hour_at(2024, 1, 1).cycle(CycleType::Daily).count(2).build().unwrap();
        let mut found = Vec::new();
        let report = expand(
            &rule,
            utc(2024, 1, 1, 0, 0, 0),
            utc(2024, 1, 31, 0, 0, 0),
            &mut |start: DateTime<Utc>, _: Duration| found.push(start),
        );
        assert_eq!(report.emitted, 2);
        assert_eq!(found, at_nine(&[(2024, 1, 1), (2024, 1, 2)]));
    }
}
