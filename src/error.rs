use std::fmt::{self, Debug, Display};
use std::io;

/// Provides `EpisimError` and maps other errors to
/// convert to an `EpisimError`.
///
/// Every variant is fatal for a run: the engine never retries and never
/// degrades its output, it stops and hands the error back to the caller.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum EpisimError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CsvError(csv::Error),
    /// A configuration value is missing or out of range.
    ConfigError(String),
    /// The restriction schedule could not be built.
    PolicyError(String),
    /// A precondition of the disease model was broken by the caller.
    InvariantViolation(String),
    /// The mobility input does not describe a valid presence sequence.
    InvalidEvent(String),
    ReportError(String),
    EpisimError(String),
}

impl From<io::Error> for EpisimError {
    fn from(error: io::Error) -> Self {
        EpisimError::IoError(error)
    }
}

impl From<serde_json::Error> for EpisimError {
    fn from(error: serde_json::Error) -> Self {
        EpisimError::JsonError(error)
    }
}

impl From<csv::Error> for EpisimError {
    fn from(error: csv::Error) -> Self {
        EpisimError::CsvError(error)
    }
}

impl From<String> for EpisimError {
    fn from(error: String) -> Self {
        EpisimError::EpisimError(error)
    }
}

impl From<&str> for EpisimError {
    fn from(error: &str) -> Self {
        EpisimError::EpisimError(error.to_string())
    }
}

impl std::error::Error for EpisimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EpisimError::IoError(error) => Some(error),
            EpisimError::JsonError(error) => Some(error),
            EpisimError::CsvError(error) => Some(error),
            _ => None,
        }
    }
}

impl Display for EpisimError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EpisimError::IoError(error) => write!(f, "I/O error: {error}"),
            EpisimError::JsonError(error) => write!(f, "JSON error: {error}"),
            EpisimError::CsvError(error) => write!(f, "CSV error: {error}"),
            EpisimError::ConfigError(msg) => write!(f, "Configuration error: {msg}"),
            EpisimError::PolicyError(msg) => write!(f, "Policy error: {msg}"),
            EpisimError::InvariantViolation(msg) => write!(f, "Invariant violation: {msg}"),
            EpisimError::InvalidEvent(msg) => write!(f, "Invalid event: {msg}"),
            EpisimError::ReportError(msg) => write!(f, "Report error: {msg}"),
            EpisimError::EpisimError(msg) => write!(f, "Error: {msg}"),
        }
    }
}
