//! Error types for the report engine
//!
//! Library code returns these typed errors; the CLI wraps them in `anyhow`.
//! Configuration problems are always surfaced before any rendering starts,
//! per-record constraint violations are values (see [`crate::render::RecordIssue`]),
//! and schedule exhaustion is an [`crate::schedule::Occurrence`] variant, not an error.

use thiserror::Error;

use crate::model::output::FormatKind;
use crate::render::RecordIssue;

/// A configuration error: something in a `ReportConfig` that makes it unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("field identifier at position {0} is empty")]
    EmptyFieldId(usize),

    #[error("duplicate field identifier '{0}'")]
    DuplicateField(String),

    #[error("{context} references unknown field '{field}'")]
    UnknownField { context: &'static str, field: String },

    #[error("'{0}' is not a valid XML element name")]
    InvalidXmlName(String),

    #[error("unknown output format '{0}' (expected xml, csv, json, xlsx or pdf)")]
    UnknownFormat(String),

    #[error("unsupported text encoding '{0}'")]
    UnsupportedEncoding(String),

    #[error("invalid CSV quote character '{0}'")]
    InvalidQuoteChar(String),

    #[error("invalid pattern constraint on field '{field}': {reason}")]
    InvalidPattern { field: String, reason: String },

    #[error("invalid cron expression '{expression}': {reason}")]
    InvalidCron { expression: String, reason: String },

    #[error("invalid calendar rule: {0}")]
    InvalidCalendar(String),

    #[error("invalid time of day '{0}', expected HH:MM")]
    InvalidTimeOfDay(String),

    #[error("unknown timezone '{0}'")]
    InvalidTimezone(String),

    #[error("{what}: '{first}' and '{second}' are mutually exclusive")]
    NonExclusive {
        what: &'static str,
        first: &'static str,
        second: &'static str,
    },

    #[error("{what} requires '{missing}'")]
    MissingPayload {
        what: &'static str,
        missing: &'static str,
    },

    #[error("records_per_file must be at least {min}, got {actual}")]
    RecordsPerFileTooSmall { min: usize, actual: usize },

    #[error("numbering pad width must be between 1 and 12, got {0}")]
    InvalidPadWidth(usize),

    #[error("filename pattern must not be empty")]
    EmptyFilenamePattern,

    #[error("split mode '{0}' needs a {{sequence}} token in the filename pattern")]
    SplitWithoutSequence(&'static str),

    #[error("duplicate destination '{0}'")]
    DuplicateDestination(String),

    #[error("unknown report template '{0}'")]
    UnknownTemplate(String),
}

/// Every configuration error found while validating one report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "invalid report configuration ({} error(s)): {}",
    .0.len(),
    .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
)]
pub struct ValidationErrors(pub Vec<ConfigError>);

impl ValidationErrors {
    pub fn errors(&self) -> &[ConfigError] {
        &self.0
    }

    pub fn contains(&self, error: &ConfigError) -> bool {
        self.0.contains(error)
    }
}

/// Errors raised while turning records into a payload.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{} record(s) violate field constraints (strict mode)", .issues.len())]
    Rejected { issues: Vec<RecordIssue> },

    #[error("{0} is a binary format and is produced by an external renderer")]
    BinaryFormat(FormatKind),

    #[error("XML writer error: {0}")]
    Xml(String),

    #[error("CSV writer error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised while evaluating a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("date arithmetic overflowed while evaluating schedule")]
    Overflow,
}

/// Umbrella error for library callers.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("split units '{first}' and '{second}' both resolve to filename '{filename}'")]
    DuplicateFilename {
        filename: String,
        first: String,
        second: String,
    },

    #[error("failed to load {what} from {path}: {message}")]
    Load {
        what: &'static str,
        path: String,
        message: String,
    },
}

/// Result type alias for engine operations
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_display_lists_every_error() {
        let errors = ValidationErrors(vec![
            ConfigError::DuplicateField("id".to_string()),
            ConfigError::EmptyFilenamePattern,
        ]);
        let message = errors.to_string();
        assert!(message.contains("2 error(s)"));
        assert!(message.contains("duplicate field identifier 'id'"));
        assert!(message.contains("filename pattern must not be empty"));
    }

    #[test]
    fn test_schedule_error_wraps_config_error() {
        let err: ScheduleError = ConfigError::InvalidTimezone("Mars/Olympus".to_string()).into();
        assert_eq!(err.to_string(), "unknown timezone 'Mars/Olympus'");
    }
}
