//! Recurrence expansion for free/busy lookups: rules, occurrences, busy periods

pub mod busy;
pub mod calendar;
pub mod error;
pub mod expand;
pub mod names;
pub mod rule;
pub mod sink;
pub mod time;
pub mod tracing;

pub use busy::{BusyPeriod, FreeBusy};
pub use error::{RuleError, RuleResult};
pub use expand::{
    CandidatePolicy, CountPolicy, Diagnostic, ExpandOptions, ExpandReport, Expander, expand,
};
pub use names::{month_index, weekday_index};
pub use rule::{CycleType, PatternType, Range, RecurrenceRule, RuleBuilder};
pub use sink::{ConflictDetector, Occurrence, OccurrenceSink};
pub use time::TimeWindow;
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
