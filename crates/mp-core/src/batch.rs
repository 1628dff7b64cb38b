//! Batch driver: convert every bundle under a directory tree.
//!
//! Pure traversal and bookkeeping — all format logic stays in `convert`.
//! The input folder structure is mirrored under the output root, and a
//! failure on one file is recorded without aborting the rest of the run.

use crate::convert::convert_file;
use crate::error::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Options for a batch run.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    /// Descend into subdirectories.
    pub recursive: bool,

    /// Print planned actions without converting anything.
    pub dry_run: bool,
}

/// Outcome for one discovered file.
#[derive(Debug, Serialize)]
pub struct FileOutcome {
    pub input: PathBuf,

    /// Output bundle path; absent on failure or dry run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// Failure message; absent on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of a whole batch run.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub discovered: usize,
    pub converted: usize,
    pub failed: usize,
    pub dry_run: bool,
    pub files: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Find every `*.gcode.3mf` file under `input_dir`, sorted for
/// deterministic processing order.
pub fn discover_inputs(input_dir: &Path, recursive: bool) -> Vec<PathBuf> {
    let max_depth = if recursive { usize::MAX } else { 1 };

    let mut inputs: Vec<PathBuf> = WalkDir::new(input_dir)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .to_lowercase()
                .ends_with(".gcode.3mf")
        })
        .map(|entry| entry.into_path())
        .collect();

    inputs.sort();
    inputs
}

/// Convert every discovered bundle, mirroring relative directories under
/// `output_dir`.
pub fn run_batch(input_dir: &Path, output_dir: &Path, opts: BatchOptions) -> Result<BatchReport> {
    std::fs::create_dir_all(output_dir)?;

    let inputs = discover_inputs(input_dir, opts.recursive);
    info!(found = inputs.len(), "Batch discovery complete");

    let mut files = Vec::with_capacity(inputs.len());
    let mut converted = 0usize;
    let mut failed = 0usize;

    for input in &inputs {
        let rel_parent = input
            .parent()
            .and_then(|p| p.strip_prefix(input_dir).ok())
            .unwrap_or(Path::new(""));
        let dst_dir = output_dir.join(rel_parent);

        if opts.dry_run {
            info!(
                input = %input.display(),
                output_dir = %dst_dir.display(),
                "[dry-run] would convert"
            );
            files.push(FileOutcome {
                input: input.clone(),
                output: None,
                error: None,
            });
            continue;
        }

        match convert_file(input, Some(&dst_dir)) {
            Ok(conversion) => {
                converted += 1;
                files.push(FileOutcome {
                    input: input.clone(),
                    output: Some(conversion.output_path),
                    error: None,
                });
            }
            Err(e) => {
                warn!(input = %input.display(), error = %e, "Conversion failed");
                failed += 1;
                files.push(FileOutcome {
                    input: input.clone(),
                    output: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    Ok(BatchReport {
        discovered: inputs.len(),
        converted,
        failed,
        dry_run: opts.dry_run,
        files,
    })
}
