//! Error handling for recording load operations.
//!
//! Provides error types with context for binary decoding, timestamp
//! normalization, and companion-file parsing failures. Fatal conditions
//! (malformed primary file) carry the offending field and byte range so a
//! failed load can name exactly what was wrong.

use thiserror::Error;

/// Result type alias for the PSG loader
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for recording load operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// EDF+ header or record layout error, naming the offending field and
    /// the byte range it was parsed from
    #[error("EDF format error in field '{field}' (bytes {start}..{end}): {message}")]
    EdfFormat {
        field: String,
        start: usize,
        end: usize,
        message: String,
    },

    /// Primary file shorter than its declared header + data section
    #[error("EDF file truncated: expected at least {expected} bytes, found {actual}")]
    EdfTruncated { expected: usize, actual: usize },

    /// Channel with a zero digital or physical range cannot be rescaled
    #[error("Signal '{label}' has a zero {kind} range and cannot be rescaled")]
    ZeroSignalRange { label: String, kind: &'static str },

    /// Timestamp matching none of the recognized encodings
    #[error("Unrecognized timestamp '{value}': {message}")]
    Timestamp { value: String, message: String },

    /// CSV parsing error
    #[error("CSV parsing error in file '{file}': {message}")]
    CsvParsing {
        file: String,
        message: String,
        #[source]
        source: Option<csv::Error>,
    },

    /// Required column missing from a companion table header row
    #[error("Required column '{column}' not found in file '{file}'")]
    MissingColumn { file: String, column: String },

    /// Scoring store JSON error
    #[error("JSON error in file '{file}': {message}")]
    Json {
        file: String,
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Data validation error
    #[error("Data validation error: {message}")]
    DataValidation { message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Background task failed to complete
    #[error("Task join error: {message}")]
    TaskJoin { message: String },
}

impl Error {
    /// Create an I/O error with context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create an EDF format error for a named field and byte range
    pub fn edf_format(
        field: impl Into<String>,
        range: std::ops::Range<usize>,
        message: impl Into<String>,
    ) -> Self {
        Self::EdfFormat {
            field: field.into(),
            start: range.start,
            end: range.end,
            message: message.into(),
        }
    }

    /// Create a truncation error
    pub fn edf_truncated(expected: usize, actual: usize) -> Self {
        Self::EdfTruncated { expected, actual }
    }

    /// Create a zero-range rescale error for a signal
    pub fn zero_signal_range(label: impl Into<String>, kind: &'static str) -> Self {
        Self::ZeroSignalRange {
            label: label.into(),
            kind,
        }
    }

    /// Create a timestamp parse error naming the unrecognized string
    pub fn timestamp(value: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Timestamp {
            value: value.into(),
            message: message.into(),
        }
    }

    /// Create a CSV parsing error with context
    pub fn csv_parsing(
        file: impl Into<String>,
        message: impl Into<String>,
        source: Option<csv::Error>,
    ) -> Self {
        Self::CsvParsing {
            file: file.into(),
            message: message.into(),
            source,
        }
    }

    /// Create a missing-column error
    pub fn missing_column(file: impl Into<String>, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            file: file.into(),
            column: column.into(),
        }
    }

    /// Create a JSON error with context
    pub fn json(
        file: impl Into<String>,
        message: impl Into<String>,
        source: Option<serde_json::Error>,
    ) -> Self {
        Self::Json {
            file: file.into(),
            message: message.into(),
            source,
        }
    }

    /// Create a data validation error
    pub fn data_validation(message: impl Into<String>) -> Self {
        Self::DataValidation {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a task join error
    pub fn task_join(message: impl Into<String>) -> Self {
        Self::TaskJoin {
            message: message.into(),
        }
    }
}

// Automatic conversions from common error types
impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: "I/O operation failed".to_string(),
            source: error,
        }
    }
}

impl From<csv::Error> for Error {
    fn from(error: csv::Error) -> Self {
        Self::CsvParsing {
            file: "unknown".to_string(),
            message: "CSV parsing failed".to_string(),
            source: Some(error),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Json {
            file: "unknown".to_string(),
            message: "JSON parsing failed".to_string(),
            source: Some(error),
        }
    }
}
