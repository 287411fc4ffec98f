//! Errors raised while constructing recurrence rules.
//!
//! Expansion itself never fails; everything that can be rejected is rejected
//! here, before a [`crate::RecurrenceRule`] exists.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// An error building a [`crate::RecurrenceRule`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    /// The first occurrence ends before it starts.
    #[error("event ends before it starts ({end} < {start})")]
    EndBeforeStart {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// The cycle name is not one of daily, weekly, monthly, yearly.
    #[error("unknown recurrence cycle `{0}`")]
    UnknownCycle(String),

    /// The pattern name is not one of daynumber, weekday, monthday, yearday.
    #[error("unknown recurrence pattern `{0}`")]
    UnknownPattern(String),

    /// The builder was finished without a cycle.
    #[error("recurrence cycle is not set")]
    MissingCycle,
}

/// A specialized Result type for rule construction.
pub type RuleResult<T> = Result<T, RuleError>;
