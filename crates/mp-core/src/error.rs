//! Error types for single-plate conversion.
//!
//! Structural and plate-selection failures are fatal and abort before any
//! output is written. Problems with optional auxiliary assets are not
//! errors at all; they surface as warnings on the conversion report.

use thiserror::Error;

/// Fatal conversion errors.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Input is not a valid/openable zip container
    #[error("unreadable archive: {0}")]
    UnreadableArchive(#[source] mp_bundle::BundleError),

    /// Manifest entry absent from the archive
    #[error("missing manifest: archive has no '{0}' entry")]
    MissingManifest(String),

    /// Manifest entry present but not parseable
    #[error("malformed manifest '{path}': {reason}")]
    MalformedManifest { path: String, reason: String },

    /// No plate references generated G-code that exists in the archive
    #[error("no exported plate: no plate references generated G-code present in the archive")]
    NoExportedPlate,

    /// More than one plate references generated G-code
    #[error("ambiguous export: plates {0:?} all reference generated G-code; refusing to guess")]
    AmbiguousExport(Vec<u32>),

    /// Canonical plate-1 path already taken by a distinct retained entry
    #[error("path collision: rewriting '{from}' to '{to}' would overwrite a distinct entry")]
    PathCollision { from: String, to: String },

    /// Container-level failure while assembling or writing the output
    #[error(transparent)]
    Bundle(#[from] mp_bundle::BundleError),

    /// I/O error outside the container layer
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for conversion operations.
pub type Result<T> = std::result::Result<T, ConvertError>;
