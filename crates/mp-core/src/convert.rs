//! Single-archive conversion pipeline.
//!
//! Read archive → structural repair → fast-path check → plate resolution →
//! rewrite → atomic write. The whole transform runs in memory; nothing is
//! written until the output entry list is complete, and fatal errors leave
//! the output directory untouched.

use crate::error::{ConvertError, Result};
use crate::fastpath::is_canonical_single_plate;
use crate::manifest;
use crate::resolve::{load_plates, select_export_target, PlateSelection};
use crate::rewrite::{
    patch_model_settings, patch_model_thumbnails, patch_relationships, patch_slice_info,
    Disposition, RewriteMap,
};
use mp_bundle::{read_path, repair_entries, BundleWriter, Entry};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Canonical double extension of exported project bundles.
const BUNDLE_SUFFIX: &str = ".gcode.3mf";

/// Summary of one successful conversion.
#[derive(Debug)]
pub struct Conversion {
    /// Where the output bundle was written.
    pub output_path: PathBuf,

    /// Original ordinal of the exported plate.
    pub ordinal: u32,

    /// Whether the input was already canonical and got copied through.
    pub fast_path: bool,

    /// Entries written to the output.
    pub written: usize,

    /// Entries dropped as other plates' assets.
    pub dropped: usize,

    /// Best-effort problems that did not stop the conversion.
    pub warnings: Vec<String>,
}

/// Convert one bundle file into a single-plate bundle next to it (or under
/// `out_dir` when given). Returns the conversion summary on success; on any
/// fatal error no output file is created.
pub fn convert_file(input: &Path, out_dir: Option<&Path>) -> Result<Conversion> {
    let out_dir = match out_dir {
        Some(dir) => dir.to_path_buf(),
        None => input.parent().unwrap_or(Path::new(".")).to_path_buf(),
    };
    std::fs::create_dir_all(&out_dir)?;

    let mut warnings = Vec::new();

    let entries = read_path(input).map_err(ConvertError::UnreadableArchive)?;
    let entries = repair_entries(entries);
    let plates = load_plates(&entries)?;

    if is_canonical_single_plate(&plates, &entries) {
        info!(input = %input.display(), "Already canonical single-plate, copying through");
        let output_path = available_output_path(&out_dir, input, 1, &mut warnings);
        return write_output(entries, output_path, 1, true, 0, warnings);
    }

    let target = match select_export_target(&plates, &entries, &mut warnings) {
        PlateSelection::Target(plate) => plate,
        PlateSelection::NoneExported => return Err(ConvertError::NoExportedPlate),
        PlateSelection::Ambiguous(ordinals) => {
            return Err(ConvertError::AmbiguousExport(ordinals))
        }
    };

    info!(plate = target.index, "Detected exported plate");

    let map = RewriteMap::build(target.index, &entries)?;
    let output_path = available_output_path(&out_dir, input, target.index, &mut warnings);

    let mut output = Vec::with_capacity(entries.len());
    let mut dropped = 0usize;

    for entry in entries {
        let name = match map.disposition(&entry.name) {
            Disposition::Exclude => {
                dropped += 1;
                continue;
            }
            Disposition::Keep => entry.name.clone(),
            Disposition::Rename(new_name) => new_name,
        };

        let data = patch_entry(&name, entry.data, &map, &mut warnings)?;
        output.push(Entry::new(name, data));
    }

    write_output(output, output_path, map.ordinal(), false, dropped, warnings)
}

/// Apply the XML patch appropriate for this entry, if any.
///
/// The plate manifest must patch cleanly; every other carrier of plate
/// identity is best-effort — on failure the original content is kept and a
/// warning recorded.
fn patch_entry(
    name: &str,
    data: Vec<u8>,
    map: &RewriteMap,
    warnings: &mut Vec<String>,
) -> Result<Vec<u8>> {
    match name {
        manifest::MODEL_SETTINGS_PATH => {
            let xml = decode_utf8(name, &data).map_err(|reason| {
                ConvertError::MalformedManifest {
                    path: name.to_string(),
                    reason,
                }
            })?;
            let patched = patch_model_settings(&xml, map, warnings).map_err(|reason| {
                ConvertError::MalformedManifest {
                    path: name.to_string(),
                    reason,
                }
            })?;
            Ok(patched.into_bytes())
        }
        manifest::SLICE_INFO_PATH => Ok(best_effort(name, data, warnings, |xml, w| {
            patch_slice_info(xml, map, w)
        })),
        manifest::COVER_RELS_PATH | manifest::SETTINGS_RELS_PATH => {
            Ok(best_effort(name, data, warnings, |xml, w| {
                patch_relationships(xml, map, w)
            }))
        }
        manifest::MODEL_PATH => Ok(best_effort(name, data, warnings, |xml, _| {
            Ok(patch_model_thumbnails(xml, map))
        })),
        _ => Ok(data),
    }
}

/// Run a best-effort patcher; fall back to the original bytes with a
/// warning when the content cannot be decoded or patched.
fn best_effort(
    name: &str,
    data: Vec<u8>,
    warnings: &mut Vec<String>,
    patch: impl FnOnce(&str, &mut Vec<String>) -> std::result::Result<String, String>,
) -> Vec<u8> {
    let xml = match decode_utf8(name, &data) {
        Ok(xml) => xml,
        Err(reason) => {
            push_warning(warnings, format!("{name}: {reason}; left unchanged"));
            return data;
        }
    };

    match patch(&xml, warnings) {
        Ok(patched) => patched.into_bytes(),
        Err(reason) => {
            push_warning(warnings, format!("{name}: {reason}; left unchanged"));
            data
        }
    }
}

fn decode_utf8(name: &str, data: &[u8]) -> std::result::Result<String, String> {
    String::from_utf8(data.to_vec()).map_err(|_| format!("'{name}' is not valid UTF-8"))
}

fn push_warning(warnings: &mut Vec<String>, message: String) {
    warn!("{message}");
    warnings.push(message);
}

fn write_output(
    entries: Vec<Entry>,
    output_path: PathBuf,
    ordinal: u32,
    fast_path: bool,
    dropped: usize,
    warnings: Vec<String>,
) -> Result<Conversion> {
    let written = entries.len();

    let mut writer = BundleWriter::new();
    for entry in entries {
        writer.add_entry(entry.name, entry.data)?;
    }
    writer.write(&output_path)?;

    info!(
        output = %output_path.display(),
        plate = ordinal,
        fast_path,
        written,
        dropped,
        "Conversion complete"
    );

    Ok(Conversion {
        output_path,
        ordinal,
        fast_path,
        written,
        dropped,
        warnings,
    })
}

/// Split an input file name into base and extension for output naming.
/// `foo.gcode.3mf` splits at the double extension; anything else splits at
/// the last dot and gets a warning.
fn split_bundle_name(file_name: &str, warnings: &mut Vec<String>) -> (String, String) {
    let lower = file_name.to_lowercase();
    if lower.ends_with(BUNDLE_SUFFIX) && file_name.len() > BUNDLE_SUFFIX.len() {
        let split = file_name.len() - BUNDLE_SUFFIX.len();
        return (file_name[..split].to_string(), file_name[split..].to_string());
    }

    push_warning(
        warnings,
        format!("input '{file_name}' does not look like a {BUNDLE_SUFFIX} bundle"),
    );

    match file_name.rfind('.') {
        Some(dot) if dot > 0 => (
            file_name[..dot].to_string(),
            file_name[dot..].to_string(),
        ),
        _ => (file_name.to_string(), String::new()),
    }
}

/// Pick the output path: `<base>_plate<K><ext>`, with an ascending integer
/// suffix when the name is already taken. Never overwrites.
fn available_output_path(
    out_dir: &Path,
    input: &Path,
    ordinal: u32,
    warnings: &mut Vec<String>,
) -> PathBuf {
    let file_name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let (base, ext) = split_bundle_name(&file_name, warnings);

    let candidate = out_dir.join(format!("{base}_plate{ordinal}{ext}"));
    if !candidate.exists() {
        return candidate;
    }

    let mut counter = 1u32;
    loop {
        let candidate = out_dir.join(format!("{base}_plate{ordinal}_{counter}{ext}"));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}
