//! Error types for the todo core.
//!
//! # Design
//! Each failure mode gets its own variant so the HTTP layer can tell
//! "fix your input" (validation, invalid argument, not found) apart from
//! "try again later" (storage). Storage errors keep the location path and
//! the underlying cause as a `source` for logging.

use std::path::PathBuf;

/// Result alias used by `TodoService`.
pub type Result<T> = std::result::Result<T, TodoError>;

/// Malformed domain input: an empty or oversized description, a
/// non-boolean `completed` flag, a non-string description.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Failures of the durable layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The storage location or its parent directory could not be created.
    #[error("failed to initialize store at {path}: {source}")]
    Init {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The stored document is not a JSON array of todo records.
    #[error("store at {path} holds malformed data: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Reading the stored document failed for a reason other than absence.
    #[error("failed to read store at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Staging or swapping in a new document failed. The previous content
    /// at `path` is untouched.
    #[error("failed to write store at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors returned by `TodoService` operations.
#[derive(Debug, thiserror::Error)]
pub enum TodoError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Malformed call-site input such as a blank id or an empty update.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No todo with the given id exists.
    #[error("todo {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Coarse classification of a `TodoError`, for callers that translate
/// errors into status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    InvalidArgument,
    NotFound,
    Storage,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Storage => "storage_error",
        }
    }
}

impl TodoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TodoError::Validation(_) => ErrorKind::Validation,
            TodoError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            TodoError::NotFound(_) => ErrorKind::NotFound,
            TodoError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// True when retrying with the same input cannot succeed.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, TodoError::Storage(_))
    }
}
