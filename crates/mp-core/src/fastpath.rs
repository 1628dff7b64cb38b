//! Fast-path detection for already-canonical bundles.
//!
//! Re-converting a converted bundle must be a content no-op. When the
//! manifest declares a single plate with ordinal 1 and nothing in the
//! archive is scoped to another ordinal, the conversion degenerates to a
//! straight repack of the cleaned entry list, skipping resolution and
//! rewriting entirely.

use crate::manifest::{PlateRecord, COVER_RELS_PATH};
use crate::rewrite::{plate_scoped_ordinal, text_references_foreign_plate};
use mp_bundle::Entry;
use tracing::debug;

/// Whether a cleaned bundle is already a canonical single-plate export.
///
/// Requires the plate's G-code to be present and non-empty: an unsliced
/// single-plate project is not an export and must go through the resolver
/// (which rejects it) rather than being copied through.
pub fn is_canonical_single_plate(plates: &[PlateRecord], entries: &[Entry]) -> bool {
    let [only] = plates else {
        return false;
    };
    if only.index != 1 {
        return false;
    }

    let gcode_ref = only.gcode_file.trim().trim_start_matches('/');
    if gcode_ref.is_empty()
        || !entries
            .iter()
            .any(|e| e.name == gcode_ref && !e.data.is_empty())
    {
        return false;
    }

    for entry in entries {
        if let Some(ordinal) = plate_scoped_ordinal(&entry.name) {
            if ordinal != 1 {
                debug!(entry = %entry.name, "Foreign plate asset blocks fast path");
                return false;
            }
        }
    }

    // Cover thumbnails can still point at another ordinal even when the
    // asset list looks clean.
    if let Some(rels) = entries.iter().find(|e| e.name == COVER_RELS_PATH) {
        if let Ok(text) = std::str::from_utf8(&rels.data) {
            if text_references_foreign_plate(text) {
                debug!("Cover relationships block fast path");
                return false;
            }
        }
    }

    true
}
