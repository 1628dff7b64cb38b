//! Single-plate conversion engine for slicer project bundles.
//!
//! Converts a multi-plate `.gcode.3mf` project bundle into an equivalent
//! single-plate bundle: the plate that was actually exported (the one with
//! generated G-code) is detected, renumbered to plate 1, and repackaged
//! with every manifest and path reference rewritten to match. Other
//! plates' assets are dropped.
//!
//! Pipeline: read archive → structural repair → fast-path check → plate
//! resolution → rewrite → atomic write. See [`convert::convert_file`] for
//! the single-archive entry point and [`batch::run_batch`] for the
//! directory driver.
//!
//! The binary entry point is in `main.rs`.

pub mod batch;
pub mod convert;
pub mod error;
pub mod exit_codes;
pub mod fastpath;
pub mod logging;
pub mod manifest;
pub mod resolve;
pub mod rewrite;

pub use convert::{convert_file, Conversion};
pub use error::{ConvertError, Result};
