use std::fmt::{self, Debug, Display};
use std::io;

use crate::agent::AgentId;
use crate::world::LocationId;

/// Provides `OutbreakError` and maps other errors to
/// convert to an `OutbreakError`
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum OutbreakError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CsvError(csv::Error),
    /// A configuration value could not be parsed or is out of range. The
    /// simulation must not start.
    ConfigError {
        field: &'static str,
        reason: String,
    },
    /// An operation was invoked out of sequence, e.g. advancing the day while
    /// agents are still out. Simulation state is left untouched.
    StateError(String),
    /// No reachable point was found near a task's location. Absorbed by the
    /// agent, which abandons the task.
    NavigationFailure {
        agent: AgentId,
        location: LocationId,
    },
    ReportError(String),
    OutbreakError(String),
}

impl OutbreakError {
    pub fn config(field: &'static str, reason: impl Into<String>) -> Self {
        OutbreakError::ConfigError {
            field,
            reason: reason.into(),
        }
    }
}

impl From<io::Error> for OutbreakError {
    fn from(error: io::Error) -> Self {
        OutbreakError::IoError(error)
    }
}

impl From<serde_json::Error> for OutbreakError {
    fn from(error: serde_json::Error) -> Self {
        OutbreakError::JsonError(error)
    }
}

impl From<csv::Error> for OutbreakError {
    fn from(error: csv::Error) -> Self {
        OutbreakError::CsvError(error)
    }
}

impl From<String> for OutbreakError {
    fn from(error: String) -> Self {
        OutbreakError::OutbreakError(error)
    }
}

impl From<&str> for OutbreakError {
    fn from(error: &str) -> Self {
        OutbreakError::OutbreakError(error.to_string())
    }
}

impl std::error::Error for OutbreakError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OutbreakError::IoError(error) => Some(error),
            OutbreakError::JsonError(error) => Some(error),
            OutbreakError::CsvError(error) => Some(error),
            _ => None,
        }
    }
}

impl Display for OutbreakError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OutbreakError::ConfigError { field, reason } => {
                write!(f, "invalid value for `{field}`: {reason}")
            }
            OutbreakError::StateError(message) => write!(f, "state error: {message}"),
            OutbreakError::NavigationFailure { agent, location } => write!(
                f,
                "no reachable point near location {location} for agent {agent}"
            ),
            OutbreakError::ReportError(message) => write!(f, "report error: {message}"),
            _ => write!(f, "Error: {self:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_names_the_field() {
        let error = OutbreakError::config("population_size", "must be greater than zero");
        assert_eq!(
            error.to_string(),
            "invalid value for `population_size`: must be greater than zero"
        );
    }

    #[test]
    fn io_errors_convert_and_keep_their_source() {
        use std::error::Error;
        let error: OutbreakError = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        assert!(matches!(error, OutbreakError::IoError(_)));
        assert!(error.source().is_some());
    }
}
