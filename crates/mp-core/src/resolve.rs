//! Export-target selection.
//!
//! A project file can declare many plates, but a `.gcode.3mf` export
//! carries generated toolpaths for exactly one of them. The selection rule
//! distinguishes that exported plate from merely configured ones:
//!
//! 1. discard plates with no (or an empty) `gcode_file` reference;
//! 2. discard plates whose reference does not resolve to a non-empty entry
//!    in the cleaned archive;
//! 3. exactly one survivor is the export target; zero or several survivors
//!    are surfaced as explicit outcomes, never guessed around.

use crate::error::ConvertError;
use crate::manifest::{self, PlateRecord};
use mp_bundle::Entry;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Outcome of the selection rule, total over every parsed manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlateSelection {
    /// Exactly one plate qualifies.
    Target(PlateRecord),

    /// No plate references generated G-code present in the archive.
    NoneExported,

    /// Several plates qualify; carries their ordinals.
    Ambiguous(Vec<u32>),
}

/// Parse the plate records out of a cleaned entry list.
pub fn load_plates(entries: &[Entry]) -> Result<Vec<PlateRecord>, ConvertError> {
    let entry = manifest::find_manifest(entries)
        .ok_or_else(|| ConvertError::MissingManifest(manifest::MODEL_SETTINGS_PATH.to_string()))?;

    let xml = std::str::from_utf8(&entry.data).map_err(|e| ConvertError::MalformedManifest {
        path: manifest::MODEL_SETTINGS_PATH.to_string(),
        reason: format!("not valid UTF-8: {e}"),
    })?;

    manifest::parse_plates(xml).map_err(|e| ConvertError::MalformedManifest {
        path: manifest::MODEL_SETTINGS_PATH.to_string(),
        reason: e.to_string(),
    })
}

/// Apply the selection rule.
///
/// A reference that resolves to a present but zero-length entry is treated
/// as a placeholder left by an incomplete export: the plate is discarded
/// from candidacy with a warning.
pub fn select_export_target(
    plates: &[PlateRecord],
    entries: &[Entry],
    warnings: &mut Vec<String>,
) -> PlateSelection {
    let present: HashMap<&str, &Entry> =
        entries.iter().map(|e| (e.name.as_str(), e)).collect();

    let mut candidates: Vec<&PlateRecord> = Vec::new();
    for plate in plates {
        let reference = plate.gcode_file.trim().trim_start_matches('/');
        if reference.is_empty() {
            debug!(plate = plate.index, "Plate has no G-code reference");
            continue;
        }

        match present.get(reference) {
            None => {
                debug!(
                    plate = plate.index,
                    gcode = reference,
                    "G-code reference not present in archive"
                );
            }
            Some(entry) if entry.data.is_empty() => {
                let msg = format!(
                    "plate {}: G-code entry '{}' is empty, treating as not exported",
                    plate.index, reference
                );
                warn!("{msg}");
                warnings.push(msg);
            }
            Some(_) => candidates.push(plate),
        }
    }

    match candidates.as_slice() {
        [single] => PlateSelection::Target((*single).clone()),
        [] => PlateSelection::NoneExported,
        many => PlateSelection::Ambiguous(many.iter().map(|p| p.index).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plate(index: u32, gcode: &str) -> PlateRecord {
        PlateRecord {
            index,
            gcode_file: gcode.to_string(),
        }
    }

    fn entry(name: &str, data: &[u8]) -> Entry {
        Entry::new(name, data.to_vec())
    }

    #[test]
    fn test_select_single_exported_plate() {
        let plates = vec![plate(1, ""), plate(2, "Metadata/plate_2.gcode")];
        let entries = vec![entry("Metadata/plate_2.gcode", b"G28\n")];
        let mut warnings = Vec::new();

        let selection = select_export_target(&plates, &entries, &mut warnings);
        assert_eq!(selection, PlateSelection::Target(plates[1].clone()));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_select_none_when_references_empty() {
        let plates = vec![plate(1, ""), plate(2, "  ")];
        let selection = select_export_target(&plates, &[], &mut Vec::new());
        assert_eq!(selection, PlateSelection::NoneExported);
    }

    #[test]
    fn test_select_none_when_reference_missing_from_archive() {
        let plates = vec![plate(2, "Metadata/plate_2.gcode")];
        let entries = vec![entry("Metadata/plate_2.png", b"png")];

        let selection = select_export_target(&plates, &entries, &mut Vec::new());
        assert_eq!(selection, PlateSelection::NoneExported);
    }

    #[test]
    fn test_select_ambiguous() {
        let plates = vec![
            plate(1, "Metadata/plate_1.gcode"),
            plate(3, "Metadata/plate_3.gcode"),
        ];
        let entries = vec![
            entry("Metadata/plate_1.gcode", b"G28\n"),
            entry("Metadata/plate_3.gcode", b"G28\n"),
        ];

        let selection = select_export_target(&plates, &entries, &mut Vec::new());
        assert_eq!(selection, PlateSelection::Ambiguous(vec![1, 3]));
    }

    #[test]
    fn test_select_zero_length_gcode_not_exported() {
        let plates = vec![
            plate(1, "Metadata/plate_1.gcode"),
            plate(2, "Metadata/plate_2.gcode"),
        ];
        let entries = vec![
            entry("Metadata/plate_1.gcode", b""),
            entry("Metadata/plate_2.gcode", b"G28\n"),
        ];
        let mut warnings = Vec::new();

        let selection = select_export_target(&plates, &entries, &mut warnings);
        assert_eq!(selection, PlateSelection::Target(plates[1].clone()));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("plate 1"));
    }

    #[test]
    fn test_select_handles_rooted_reference() {
        let plates = vec![plate(5, "/Metadata/plate_5.gcode")];
        let entries = vec![entry("Metadata/plate_5.gcode", b"G28\n")];

        let selection = select_export_target(&plates, &entries, &mut Vec::new());
        assert_eq!(selection, PlateSelection::Target(plates[0].clone()));
    }

    #[test]
    fn test_load_plates_missing_manifest() {
        let entries = vec![entry("[Content_Types].xml", b"<Types/>")];
        let result = load_plates(&entries);
        assert!(matches!(result, Err(ConvertError::MissingManifest(_))));
    }

    #[test]
    fn test_load_plates_malformed_manifest() {
        let entries = vec![entry(
            manifest::MODEL_SETTINGS_PATH,
            b"<config><plate></config>",
        )];
        let result = load_plates(&entries);
        assert!(matches!(
            result,
            Err(ConvertError::MalformedManifest { .. })
        ));
    }
}
