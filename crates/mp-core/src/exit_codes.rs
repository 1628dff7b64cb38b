//! Exit codes for the monoplate CLI.
//!
//! Exit codes communicate outcome without requiring output parsing.
//!
//! Ranges:
//! - 0-9: success/operational outcomes
//! - 10-19: user/environment errors (recoverable by fixing the input)
//! - 20-29: internal errors

use crate::error::ConvertError;

/// Stable exit-code contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success: conversion(s) completed
    Clean = 0,

    /// Batch finished but some files failed
    PartialFail = 3,

    /// Invalid arguments or input path
    ArgsError = 10,

    /// Input is not a valid/openable zip container
    ArchiveError = 11,

    /// Manifest absent or not parseable
    ManifestError = 12,

    /// No exported plate, or more than one
    PlateSelectionError = 13,

    /// Canonical path collides with a distinct retained entry
    CollisionError = 14,

    /// Internal error (bug - please report)
    InternalError = 20,

    /// I/O error
    IoError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Whether this code indicates a fully successful run.
    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Clean)
    }

    /// Error code name as a string constant (for logs and scripts).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK",
            ExitCode::PartialFail => "ERR_PARTIAL",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ArchiveError => "ERR_ARCHIVE",
            ExitCode::ManifestError => "ERR_MANIFEST",
            ExitCode::PlateSelectionError => "ERR_PLATE_SELECTION",
            ExitCode::CollisionError => "ERR_COLLISION",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<&ConvertError> for ExitCode {
    fn from(error: &ConvertError) -> Self {
        match error {
            ConvertError::UnreadableArchive(_) => ExitCode::ArchiveError,
            ConvertError::MissingManifest(_) | ConvertError::MalformedManifest { .. } => {
                ExitCode::ManifestError
            }
            ConvertError::NoExportedPlate | ConvertError::AmbiguousExport(_) => {
                ExitCode::PlateSelectionError
            }
            ConvertError::PathCollision { .. } => ExitCode::CollisionError,
            ConvertError::Bundle(_) | ConvertError::Io(_) => ExitCode::IoError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
