//! Error types for iCalendar conversion.

use std::fmt;
use thiserror::Error;

/// The category of an [`IcalError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IcalErrorCode {
    /// The text is not an iCalendar object at all.
    InvalidCalendar,
    /// A required property (`UID`, `DTSTART`, `FREQ`) is absent.
    MissingProperty,
    /// A property value could not be parsed.
    InvalidValue,
    /// `FREQ` names a frequency the engine does not expand (`HOURLY`, ...).
    UnsupportedFrequency,
    /// The converted rule was rejected by the engine's rule builder.
    InvalidRule,
}

impl IcalErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidCalendar => "invalid_calendar",
            Self::MissingProperty => "missing_property",
            Self::InvalidValue => "invalid_value",
            Self::UnsupportedFrequency => "unsupported_frequency",
            Self::InvalidRule => "invalid_rule",
        }
    }
}

impl fmt::Display for IcalErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error converting iCalendar data.
#[derive(Debug, Error)]
pub struct IcalError {
    code: IcalErrorCode,
    message: String,
    /// UID of the event being converted, when known.
    uid: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl IcalError {
    pub fn new(code: IcalErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            uid: None,
            source: None,
        }
    }

    pub fn invalid_calendar(message: impl Into<String>) -> Self {
        Self::new(IcalErrorCode::InvalidCalendar, message)
    }

    pub fn missing(property: &str) -> Self {
        Self::new(
            IcalErrorCode::MissingProperty,
            format!("missing {property} property"),
        )
    }

    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::new(IcalErrorCode::InvalidValue, message)
    }

    pub fn unsupported_frequency(freq: &str) -> Self {
        Self::new(
            IcalErrorCode::UnsupportedFrequency,
            format!("unsupported recurrence frequency `{freq}`"),
        )
    }

    pub fn invalid_rule(message: impl Into<String>) -> Self {
        Self::new(IcalErrorCode::InvalidRule, message)
    }

    #[must_use]
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    #[must_use]
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> IcalErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn uid(&self) -> Option<&str> {
        self.uid.as_deref()
    }
}

impl fmt::Display for IcalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref uid) = self.uid {
            write!(f, "[{uid}] ")?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl From<freebusy_core::RuleError> for IcalError {
    fn from(err: freebusy_core::RuleError) -> Self {
        Self::invalid_rule(err.to_string()).with_source(err)
    }
}

/// A specialized Result type for iCalendar conversion.
pub type IcalResult<T> = Result<T, IcalError>;
