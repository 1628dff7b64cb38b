//! Error types for container operations.

use thiserror::Error;

/// Errors that can occur while reading or writing a bundle container.
#[derive(Error, Debug)]
pub enum BundleError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP archive error
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Two entries with the same name
    #[error("duplicate entry name: {0}")]
    DuplicateEntry(String),

    /// Entry name that cannot appear in a well-formed bundle
    #[error("invalid entry name: {0}")]
    InvalidEntryName(String),

    /// Bundle has no entries to write
    #[error("bundle has no content to write")]
    EmptyBundle,

    /// Staged output could not be moved into place
    #[error("failed to persist output at '{path}': {source}")]
    Persist {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for container operations.
pub type Result<T> = std::result::Result<T, BundleError>;
