//! ZIP container layer for slicer project bundles.
//!
//! A `.gcode.3mf` project bundle is a plain ZIP archive. This crate covers
//! the container side only: reading the entry list, structural repair of
//! hand-rezipped archives, and atomic output writing. Plate semantics — the
//! manifest, export-target selection, path rewriting — live in `mp-core`.
//!
//! # Example
//!
//! ```no_run
//! use mp_bundle::{read_path, repair_entries, BundleWriter};
//! use std::path::Path;
//!
//! let entries = read_path(Path::new("input.gcode.3mf")).unwrap();
//! let entries = repair_entries(entries);
//!
//! let mut writer = BundleWriter::new();
//! for entry in entries {
//!     writer.add_entry(entry.name, entry.data).unwrap();
//! }
//! writer.write(Path::new("output.gcode.3mf")).unwrap();
//! ```

pub mod error;
pub mod reader;
pub mod repair;
pub mod writer;

pub use error::{BundleError, Result};
pub use reader::{read_bytes, read_path, Entry};
pub use repair::{is_junk, repair_entries, ROOT_MARKER};
pub use writer::BundleWriter;
