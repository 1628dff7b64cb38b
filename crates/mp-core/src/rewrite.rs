//! Path rewriting for canonicalizing the export target to plate 1.
//!
//! Plate identity is encoded redundantly across the bundle: in asset
//! filenames (`Metadata/plate_2.gcode`, `Metadata/top_2.png`), in relationship
//! targets, and in numeric manifest attributes. The [`RewriteMap`] is built
//! once per conversion and consulted by both the entry-filtering step and
//! every XML patcher, so the archive layout and the manifest content cannot
//! drift apart.

use crate::error::ConvertError;
use crate::manifest::{local_name, metadata_kv};
use mp_bundle::Entry;
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;
use tracing::debug;

/// Result of an XML patch attempt; the error carries a human-readable
/// reason so callers can decide between fatal and best-effort handling.
pub type PatchResult = std::result::Result<String, String>;

/// Known per-plate asset filename families, ordinal embedded before the
/// extension (`plate_2.gcode.md5`, `plate_no_light_2.png`) or before a
/// `_small` thumbnail suffix (`plate_2_small.png`). The stem list is closed
/// so object files like `3D/Objects/object_1.model` are never touched.
fn plate_file_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(plate_no_light|plate|top|pick|front|back)_(\d+)(_small)?(\.[^/]+)$")
            .expect("valid plate file pattern")
    })
}

/// Per-plate directory segments (`.../plate_2/...`).
fn plate_dir_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^plate_(\d+)$").expect("valid plate dir pattern"))
}

/// The plate ordinal a path is scoped to, if any. Directory segments take
/// precedence over the filename.
pub fn plate_scoped_ordinal(name: &str) -> Option<u32> {
    let segments: Vec<&str> = name.split('/').collect();
    let (dirs, base) = segments.split_at(segments.len() - 1);

    for dir in dirs {
        if let Some(caps) = plate_dir_re().captures(dir) {
            return caps[1].parse().ok();
        }
    }

    plate_file_re()
        .captures(base[0])
        .and_then(|caps| caps[2].parse().ok())
}

/// Renumber every plate-scoped piece of `name` tagged `from` to `to`.
pub fn renumber_plate_path(name: &str, from: u32, to: u32) -> String {
    let segments: Vec<&str> = name.split('/').collect();
    let (dirs, base) = segments.split_at(segments.len() - 1);

    let mut out: Vec<String> = Vec::with_capacity(segments.len());
    for dir in dirs {
        match plate_dir_re().captures(dir) {
            Some(caps) if caps[1].parse::<u32>().ok() == Some(from) => {
                out.push(format!("plate_{to}"))
            }
            _ => out.push((*dir).to_string()),
        }
    }

    match plate_file_re().captures(base[0]) {
        Some(caps) if caps[2].parse::<u32>().ok() == Some(from) => {
            let small = caps.get(3).map_or("", |m| m.as_str());
            out.push(format!("{}_{}{}{}", &caps[1], to, small, &caps[4]));
        }
        _ => out.push(base[0].to_string()),
    }

    out.join("/")
}

/// Whether free text (e.g. relationship XML) mentions a plate-scoped asset
/// of any ordinal other than 1. Used by the fast-path check.
pub fn text_references_foreign_plate(text: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?:plate_no_light|plate|top|pick|front|back)_(\d+)")
            .expect("valid plate mention pattern")
    });

    re.captures_iter(text)
        .any(|caps| caps[1].parse::<u32>().map(|n| n != 1).unwrap_or(false))
}

/// What to do with one input entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Retain under its original name.
    Keep,

    /// Retain under the canonical plate-1 name.
    Rename(String),

    /// Belongs to a non-exported plate; drop.
    Exclude,
}

/// The per-conversion mapping from export-target paths to canonical
/// plate-1 paths, plus the exclusion set for other plates' assets.
#[derive(Debug)]
pub struct RewriteMap {
    ordinal: u32,
    renames: BTreeMap<String, String>,
    excluded: BTreeSet<String>,
    retained: BTreeSet<String>,
}

impl RewriteMap {
    /// Classify every entry against the export target's ordinal.
    ///
    /// Fails with `PathCollision` if a canonical plate-1 path is already
    /// taken by a different retained entry; that only happens in corrupted
    /// input and must never be resolved by overwriting.
    pub fn build(ordinal: u32, entries: &[Entry]) -> Result<RewriteMap, ConvertError> {
        let mut renames = BTreeMap::new();
        let mut excluded = BTreeSet::new();
        let mut retained = BTreeSet::new();

        for entry in entries {
            match plate_scoped_ordinal(&entry.name) {
                Some(n) if n == ordinal => {
                    let target = renumber_plate_path(&entry.name, ordinal, 1);
                    if target != entry.name {
                        renames.insert(entry.name.clone(), target);
                    } else {
                        retained.insert(entry.name.clone());
                    }
                }
                Some(_) => {
                    excluded.insert(entry.name.clone());
                }
                None => {
                    retained.insert(entry.name.clone());
                }
            }
        }

        for (from, to) in &renames {
            if !retained.insert(to.clone()) {
                return Err(ConvertError::PathCollision {
                    from: from.clone(),
                    to: to.clone(),
                });
            }
        }

        debug!(
            ordinal,
            renamed = renames.len(),
            excluded = excluded.len(),
            "Rewrite map built"
        );

        Ok(RewriteMap {
            ordinal,
            renames,
            excluded,
            retained,
        })
    }

    /// Original ordinal of the export target.
    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    /// Disposition of one input entry name.
    pub fn disposition(&self, name: &str) -> Disposition {
        if self.excluded.contains(name) {
            Disposition::Exclude
        } else if let Some(target) = self.renames.get(name) {
            Disposition::Rename(target.clone())
        } else {
            Disposition::Keep
        }
    }

    /// Rewrite a path reference found inside XML content (tolerates a
    /// leading `/`). Returns `None` when the value needs no change.
    pub fn rewrite_ref(&self, value: &str) -> Option<String> {
        let (slash, path) = match value.strip_prefix('/') {
            Some(rest) => ("/", rest),
            None => ("", value),
        };

        match plate_scoped_ordinal(path) {
            Some(n) if n == self.ordinal => {
                let renumbered = renumber_plate_path(path, self.ordinal, 1);
                if renumbered == path {
                    None
                } else {
                    Some(format!("{slash}{renumbered}"))
                }
            }
            _ => None,
        }
    }

    /// Whether the output archive will contain an entry under this name
    /// (leading `/` tolerated).
    pub fn has_output_entry(&self, name: &str) -> bool {
        self.retained.contains(name.trim_start_matches('/'))
    }
}

// ============================================================================
// XML patchers
// ============================================================================

struct PlateFilter<'a> {
    map: &'a RewriteMap,
    /// Metadata key that carries the plate ordinal in this document.
    id_key: &'a str,
    /// Whether metadata values are path references to rewrite.
    rewrite_refs: bool,
}

/// Regenerate `model_settings.config`: only the export target's `<plate>`
/// survives, renumbered to plate 1 with its asset references rewritten.
/// Everything outside `<plate>` elements passes through byte-for-byte.
pub fn patch_model_settings(
    xml: &str,
    map: &RewriteMap,
    warnings: &mut Vec<String>,
) -> PatchResult {
    let filter = PlateFilter {
        map,
        id_key: "plater_id",
        rewrite_refs: true,
    };
    let (output, kept) = filter_plates(xml, &filter, warnings)?;
    if !kept {
        return Err(format!("plate {} not declared in manifest", map.ordinal()));
    }
    Ok(output)
}

/// Regenerate `slice_info.config`: keep the `<plate>` whose `index` matches
/// the export target, renumbered to 1, and drop the rest.
pub fn patch_slice_info(xml: &str, map: &RewriteMap, warnings: &mut Vec<String>) -> PatchResult {
    let filter = PlateFilter {
        map,
        id_key: "index",
        rewrite_refs: false,
    };
    let (output, kept) = filter_plates(xml, &filter, warnings)?;
    if !kept {
        return Err(format!("no plate with index {}", map.ordinal()));
    }
    Ok(output)
}

/// Rewrite `Target` attributes of relationship documents (`_rels/.rels`,
/// `Metadata/_rels/model_settings.config.rels`).
pub fn patch_relationships(
    xml: &str,
    map: &RewriteMap,
    warnings: &mut Vec<String>,
) -> PatchResult {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());

    loop {
        let event = reader.read_event().map_err(|e| e.to_string())?;
        match event {
            Event::Start(ref e) if local_name(e.name().as_ref()) == b"Relationship" => {
                let rewritten = rewrite_target_attr(e, map, warnings)?;
                writer
                    .write_event(Event::Start(rewritten))
                    .map_err(|e| e.to_string())?;
            }
            Event::Empty(ref e) if local_name(e.name().as_ref()) == b"Relationship" => {
                let rewritten = rewrite_target_attr(e, map, warnings)?;
                writer
                    .write_event(Event::Empty(rewritten))
                    .map_err(|e| e.to_string())?;
            }
            Event::Eof => break,
            other => writer.write_event(other).map_err(|e| e.to_string())?,
        }
    }

    String::from_utf8(writer.into_inner()).map_err(|e| e.to_string())
}

/// Rewrite thumbnail references in the scene description
/// (`<metadata name="Thumbnail_Middle">/Metadata/plate_2.png</metadata>`).
/// The scene geometry is never re-serialized; this is a targeted
/// replacement on the metadata elements only.
pub fn patch_model_thumbnails(xml: &str, map: &RewriteMap) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r#"(<metadata\s+name="Thumbnail_[A-Za-z]+">\s*)([^<\s]+)(\s*</metadata>)"#)
            .expect("valid thumbnail metadata pattern")
    });

    re.replace_all(xml, |caps: &regex::Captures| {
        match map.rewrite_ref(&caps[2]) {
            Some(rewritten) => format!("{}{}{}", &caps[1], rewritten, &caps[3]),
            None => caps[0].to_string(),
        }
    })
    .into_owned()
}

/// Stream `xml` through, dropping every `<plate>` subtree except the export
/// target's, which is re-emitted renumbered. Returns the output and whether
/// the target plate was found.
fn filter_plates(
    xml: &str,
    filter: &PlateFilter<'_>,
    warnings: &mut Vec<String>,
) -> std::result::Result<(String, bool), String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    let mut kept = false;

    loop {
        let event = reader.read_event().map_err(|e| e.to_string())?;
        match event {
            Event::Start(ref e) if local_name(e.name().as_ref()) == b"plate" => {
                let subtree = collect_subtree(&mut reader, Event::Start(e.clone().into_owned()))?;
                if plate_id_of(&subtree, filter.id_key) == Some(filter.map.ordinal()) {
                    emit_plate(&mut writer, &subtree, filter, warnings)?;
                    kept = true;
                }
            }
            // A self-closed <plate/> carries no ordinal; it can never be
            // the export target, so it is dropped either way.
            Event::Empty(ref e) if local_name(e.name().as_ref()) == b"plate" => {}
            Event::Eof => break,
            other => writer.write_event(other).map_err(|e| e.to_string())?,
        }
    }

    let output = String::from_utf8(writer.into_inner()).map_err(|e| e.to_string())?;
    Ok((output, kept))
}

/// Buffer a whole element subtree, first event included.
fn collect_subtree(
    reader: &mut Reader<&[u8]>,
    first: Event<'static>,
) -> std::result::Result<Vec<Event<'static>>, String> {
    let mut events = vec![first];
    let mut depth = 1usize;

    while depth > 0 {
        let event = reader.read_event().map_err(|e| e.to_string())?;
        match &event {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth -= 1,
            Event::Eof => return Err("unexpected end of document inside <plate>".to_string()),
            _ => {}
        }
        events.push(event.into_owned());
    }

    Ok(events)
}

/// Ordinal declared by a buffered plate subtree, read from its direct-child
/// metadata.
fn plate_id_of(events: &[Event<'_>], id_key: &str) -> Option<u32> {
    let mut depth = 0usize;

    for event in events {
        match event {
            Event::Start(e) => {
                if depth == 1 {
                    if let Some(id) = metadata_ordinal(e, id_key) {
                        return Some(id);
                    }
                }
                depth += 1;
            }
            Event::Empty(e) => {
                if depth == 1 {
                    if let Some(id) = metadata_ordinal(e, id_key) {
                        return Some(id);
                    }
                }
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            _ => {}
        }
    }

    None
}

fn metadata_ordinal(e: &BytesStart, id_key: &str) -> Option<u32> {
    if local_name(e.name().as_ref()) != b"metadata" {
        return None;
    }
    match metadata_kv(e) {
        Ok(Some((key, value))) if key == id_key => value.parse().ok(),
        _ => None,
    }
}

/// Re-emit the kept plate subtree with its ordinal set to 1 and (when
/// requested) path references rewritten through the map.
fn emit_plate(
    writer: &mut Writer<Vec<u8>>,
    events: &[Event<'static>],
    filter: &PlateFilter<'_>,
    warnings: &mut Vec<String>,
) -> std::result::Result<(), String> {
    let mut depth = 0usize;

    for event in events {
        match event {
            Event::Start(e) => {
                if depth == 1 && local_name(e.name().as_ref()) == b"metadata" {
                    let rewritten = rewrite_metadata_elem(e, filter, warnings)?;
                    writer
                        .write_event(Event::Start(rewritten))
                        .map_err(|e| e.to_string())?;
                } else {
                    writer
                        .write_event(Event::Start(e.clone()))
                        .map_err(|e| e.to_string())?;
                }
                depth += 1;
            }
            Event::Empty(e) => {
                if depth == 1 && local_name(e.name().as_ref()) == b"metadata" {
                    let rewritten = rewrite_metadata_elem(e, filter, warnings)?;
                    writer
                        .write_event(Event::Empty(rewritten))
                        .map_err(|e| e.to_string())?;
                } else {
                    writer
                        .write_event(Event::Empty(e.clone()))
                        .map_err(|e| e.to_string())?;
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                writer
                    .write_event(event.clone())
                    .map_err(|e| e.to_string())?;
            }
            other => writer
                .write_event(other.clone())
                .map_err(|e| e.to_string())?,
        }
    }

    Ok(())
}

/// Rebuild one plate metadata element: the ordinal key becomes `1`, path
/// values go through the rewrite map, everything else is copied as-is.
fn rewrite_metadata_elem(
    e: &BytesStart<'_>,
    filter: &PlateFilter<'_>,
    warnings: &mut Vec<String>,
) -> std::result::Result<BytesStart<'static>, String> {
    let key = match metadata_kv(e).map_err(|err| err.to_string())? {
        Some((key, _)) => key,
        None => String::new(),
    };

    let name = String::from_utf8(e.name().as_ref().to_vec()).map_err(|err| err.to_string())?;
    let mut out = BytesStart::new(name);

    for attr in e.attributes() {
        let attr = attr.map_err(|err| err.to_string())?;
        if attr.key.as_ref() == b"value" {
            let raw = attr.unescape_value().map_err(|err| err.to_string())?;
            let new_value = if key == filter.id_key {
                "1".to_string()
            } else if filter.rewrite_refs {
                match filter.map.rewrite_ref(&raw) {
                    Some(rewritten) => {
                        if !filter.map.has_output_entry(&rewritten) {
                            warnings.push(format!(
                                "referenced asset '{raw}' is not present in the archive; \
                                 reference renumbered to '{rewritten}' anyway"
                            ));
                        }
                        rewritten
                    }
                    None => raw.into_owned(),
                }
            } else {
                raw.into_owned()
            };
            out.push_attribute(("value", new_value.as_str()));
        } else {
            out.push_attribute(attr);
        }
    }

    Ok(out)
}

/// Rebuild a relationship element with its `Target` rewritten.
fn rewrite_target_attr(
    e: &BytesStart<'_>,
    map: &RewriteMap,
    warnings: &mut Vec<String>,
) -> std::result::Result<BytesStart<'static>, String> {
    let name = String::from_utf8(e.name().as_ref().to_vec()).map_err(|err| err.to_string())?;
    let mut out = BytesStart::new(name);

    for attr in e.attributes() {
        let attr = attr.map_err(|err| err.to_string())?;
        if attr.key.as_ref() == b"Target" {
            let raw = attr.unescape_value().map_err(|err| err.to_string())?;
            match map.rewrite_ref(&raw) {
                Some(rewritten) => {
                    if !map.has_output_entry(&rewritten) {
                        warnings.push(format!(
                            "relationship target '{raw}' is not present in the archive; \
                             target renumbered to '{rewritten}' anyway"
                        ));
                    }
                    out.push_attribute(("Target", rewritten.as_str()));
                }
                None => out.push_attribute(("Target", raw.as_ref())),
            }
        } else {
            out.push_attribute(attr);
        }
    }

    Ok(out)
}
