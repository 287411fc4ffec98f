//! Client error types.

use std::fmt;
use std::path::PathBuf;

use freebusy_ical::IcalError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// A calendar file could not be read.
    Read { path: PathBuf, source: std::io::Error },
    /// A calendar file is not valid iCalendar.
    Calendar { path: PathBuf, source: IcalError },
    /// The request file holds no blocking event.
    EmptyRequest(PathBuf),
    /// The query window is empty or out of range.
    Window(String),
    /// Output could not be rendered.
    Output(String),
    /// IO error.
    Io(std::io::Error),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Read { path, source } => {
                write!(f, "cannot read {}: {}", path.display(), source)
            }
            Self::Calendar { path, source } => write!(f, "{}: {}", path.display(), source),
            Self::EmptyRequest(path) => {
                write!(f, "{}: no blocking event to check", path.display())
            }
            Self::Window(msg) => write!(f, "invalid window: {}", msg),
            Self::Output(msg) => write!(f, "output error: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Calendar { source, .. } => Some(source),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Output(err.to_string())
    }
}
