//! Structural repair of malformed input archives.
//!
//! Two defects show up in bundles that were unpacked and re-zipped by hand:
//! platform junk entries (`__MACOSX/`, `.DS_Store`, `Thumbs.db`) and a
//! single wrapper directory around the whole payload. Both are container
//! defects, not format defects, so they are fixed here as a pure
//! entry-list transform before any manifest parsing happens.

use crate::reader::Entry;
use tracing::{debug, warn};

/// Conventional root marker of a project bundle. A valid bundle has this
/// entry at the archive root; finding it only under a shared prefix is the
/// signature of the wrapper-directory mistake.
pub const ROOT_MARKER: &str = "[Content_Types].xml";

const JUNK_PREFIXES: &[&str] = &["__MACOSX/"];
const JUNK_FILE_NAMES: &[&str] = &[".DS_Store", "Thumbs.db"];

/// Whether an entry name matches a known platform-junk pattern.
pub fn is_junk(name: &str) -> bool {
    if JUNK_PREFIXES.iter().any(|p| name.starts_with(p)) {
        return true;
    }
    let base = name.rsplit('/').next().unwrap_or(name);
    JUNK_FILE_NAMES.contains(&base)
}

/// Normalize a raw entry list: drop junk and directory placeholders, then
/// strip a single wrapper prefix if one covers every remaining entry.
pub fn repair_entries(entries: Vec<Entry>) -> Vec<Entry> {
    let before = entries.len();
    let mut cleaned: Vec<Entry> = entries
        .into_iter()
        .filter(|e| !e.is_dir() && !is_junk(&e.name))
        .collect();

    if cleaned.len() != before {
        debug!(
            removed = before - cleaned.len(),
            "Removed junk/placeholder entries"
        );
    }

    if let Some(prefix) = wrapper_prefix(&cleaned) {
        warn!(prefix = %prefix, "Flattening wrapper directory");
        for entry in &mut cleaned {
            entry.name = entry.name[prefix.len()..].to_string();
        }
        // Junk that was nested inside the wrapper is root junk now.
        cleaned.retain(|e| !is_junk(&e.name));
    }

    cleaned
}

/// Detect a wrapper directory: the root marker is absent at the root but
/// present as `<prefix>/[Content_Types].xml`, and every entry shares that
/// prefix. Returns the prefix to strip, trailing slash included.
fn wrapper_prefix(entries: &[Entry]) -> Option<String> {
    if entries.iter().any(|e| e.name == ROOT_MARKER) {
        return None;
    }

    let suffix = format!("/{ROOT_MARKER}");
    let candidate = entries
        .iter()
        .filter(|e| e.name.ends_with(&suffix))
        .min_by_key(|e| e.name.len())?;

    let prefix = &candidate.name[..candidate.name.len() - ROOT_MARKER.len()];
    if entries.iter().all(|e| e.name.starts_with(prefix)) {
        Some(prefix.to_string())
    } else {
        None
    }
}
