//! Error types for configdict.
//!
//! Every failure carries a stable numeric code so callers can branch on the
//! kind of failure without matching on message text:
//! - 10-19: schema errors (raised while building a dictionary)
//! - 20-29: write errors (unknown keys, constraint violations, vetoes)
//! - 30-39: naming and registry errors
//! - 40-49: storage errors (missing files, parse failures, I/O)
//! - 50-59: collaborator errors (editor, watcher)

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for configdict operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed default/validator definitions.
    Schema,
    /// Rejected mutations.
    Write,
    /// Invalid or conflicting configuration names.
    Naming,
    /// Reading or writing the backing file.
    Storage,
    /// External editor or watcher failures.
    Collaborator,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Schema => write!(f, "schema"),
            ErrorCategory::Write => write!(f, "write"),
            ErrorCategory::Naming => write!(f, "naming"),
            ErrorCategory::Storage => write!(f, "storage"),
            ErrorCategory::Collaborator => write!(f, "collaborator"),
        }
    }
}

/// Unified error type for configdict.
#[derive(Error, Debug)]
pub enum Error {
    // Schema errors (10-19)
    #[error("schema error: {0}")]
    Schema(String),

    // Write errors (20-29)
    #[error("unknown key: {key}")]
    UnknownKey { key: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("change to {key} rejected: {reason}")]
    Rejected { key: String, reason: String },

    #[error("invalid callback pattern {pattern:?}: {message}")]
    Pattern { pattern: String, message: String },

    // Naming errors (30-39)
    #[error("invalid config name {0:?}: it should contain letters, numbers and any of '.', '_', ':'")]
    InvalidName(String),

    #[error("config name {0:?} is already taken")]
    NameTaken(String),

    // Storage errors (40-49)
    #[error("config file not found and no default given: {}", .0.display())]
    NotFound(PathBuf),

    #[error("could not parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("unsupported config format {format:?} (supported: json, yaml)")]
    UnsupportedFormat { format: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // Collaborator errors (50-59)
    #[error("external editor failed: {0}")]
    Editor(String),
}

impl Error {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns the error code for this error type.
    pub fn code(&self) -> u32 {
        match self {
            Error::Schema(_) => 10,
            Error::UnknownKey { .. } => 20,
            Error::Validation(_) => 21,
            Error::Rejected { .. } => 22,
            Error::Pattern { .. } => 23,
            Error::InvalidName(_) => 30,
            Error::NameTaken(_) => 31,
            Error::NotFound(_) => 40,
            Error::Parse { .. } => 41,
            Error::UnsupportedFormat { .. } => 42,
            Error::Io { .. } => 43,
            Error::Json(_) => 44,
            Error::Yaml(_) => 45,
            Error::Editor(_) => 50,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Schema(_) => ErrorCategory::Schema,
            Error::UnknownKey { .. }
            | Error::Validation(_)
            | Error::Rejected { .. }
            | Error::Pattern { .. } => ErrorCategory::Write,
            Error::InvalidName(_) | Error::NameTaken(_) => ErrorCategory::Naming,
            Error::NotFound(_)
            | Error::Parse { .. }
            | Error::UnsupportedFormat { .. }
            | Error::Io { .. }
            | Error::Json(_)
            | Error::Yaml(_) => ErrorCategory::Storage,
            Error::Editor(_) => ErrorCategory::Collaborator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_grouped_by_category() {
        let cases = [
            (Error::Schema("x".into()), ErrorCategory::Schema, 10),
            (
                Error::UnknownKey { key: "k".into() },
                ErrorCategory::Write,
                20,
            ),
            (Error::InvalidName("a b".into()), ErrorCategory::Naming, 30),
            (
                Error::NotFound(PathBuf::from("/nope.json")),
                ErrorCategory::Storage,
                40,
            ),
            (Error::Editor("gone".into()), ErrorCategory::Collaborator, 50),
        ];
        for (err, category, code) in cases {
            assert_eq!(err.category(), category);
            assert_eq!(err.code(), code);
        }
    }

    #[test]
    fn test_io_error_mentions_path() {
        let err = Error::io(
            "/tmp/cfg/app.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/cfg/app.json"));
        assert!(msg.contains("denied"));
    }
}
