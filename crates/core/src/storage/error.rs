//! Attachment storage errors.
//!
//! Failures on a stored file carry the attachment path so the log line names
//! the transaction directory it belongs to.

use opendal::ErrorKind;
use thiserror::Error;

/// Failure while reaching or changing attachment files.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No file or directory at the attachment path.
    #[error("attachment not found: {path}")]
    NotFound {
        /// Attachment path as requested.
        path: String,
    },

    /// The provider settings do not describe a usable backend.
    #[error("invalid attachment storage settings: {0}")]
    Configuration(String),

    /// The backend rejected an operation on an attachment path.
    #[error("attachment storage failed on {path}: {message}")]
    Backend {
        /// Attachment file or directory.
        path: String,
        /// Backend error text.
        message: String,
    },
}

impl StorageError {
    /// Settings error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Maps a backend error raised while working on `path`.
    #[must_use]
    pub fn at(path: &str, err: &opendal::Error) -> Self {
        match err.kind() {
            ErrorKind::NotFound => Self::NotFound {
                path: path.to_string(),
            },
            _ => Self::Backend {
                path: path.to_string(),
                message: err.to_string(),
            },
        }
    }

    /// Maps a backend error raised while building the operator.
    #[must_use]
    pub fn provider(err: &opendal::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}
