//! Audit error types.

use std::path::PathBuf;

/// Errors that can occur while persisting audit records.
#[derive(thiserror::Error, Debug)]
pub enum AuditError {
    /// Failed to create the log's parent directory.
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to open the log file.
    #[error("Failed to open audit log at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Seek-to-end or write failed; the record was not persisted.
    #[error("Failed to append to audit log at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A record that cannot be rendered as a single log line.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Field {field} contains a line break")]
    LineBreak { field: &'static str },
}

/// A log line that does not hold a valid record.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("Expected 5 fields, found {0}")]
    FieldCount(usize),

    #[error("Invalid {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Unknown event kind: {0:?}")]
    UnknownKind(String),
}
