//! Plate manifest parsing.
//!
//! A project bundle declares its plates in `Metadata/model_settings.config`,
//! an XML document of the form:
//!
//! ```xml
//! <config>
//!   <object id="2">...</object>
//!   <plate>
//!     <metadata key="plater_id" value="2"/>
//!     <metadata key="gcode_file" value="Metadata/plate_2.gcode"/>
//!     <metadata key="thumbnail_file" value="Metadata/plate_2.png"/>
//!     <model_instance>
//!       <metadata key="object_id" value="2"/>
//!     </model_instance>
//!   </plate>
//! </config>
//! ```
//!
//! Only metadata elements that are direct children of a `<plate>` carry
//! plate identity; `model_instance` metadata is ignored here.

use mp_bundle::Entry;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Fixed path of the plate manifest within a bundle.
pub const MODEL_SETTINGS_PATH: &str = "Metadata/model_settings.config";

/// Per-plate slicing summary; carries a plate `index` that must agree with
/// the manifest after renumbering.
pub const SLICE_INFO_PATH: &str = "Metadata/slice_info.config";

/// Package relationships; points at the cover thumbnails.
pub const COVER_RELS_PATH: &str = "_rels/.rels";

/// Relationships of the plate manifest; points at the generated G-code.
pub const SETTINGS_RELS_PATH: &str = "Metadata/_rels/model_settings.config.rels";

/// Scene description; carries thumbnail references in its metadata.
pub const MODEL_PATH: &str = "3D/3dmodel.model";

/// One plate declaration from the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlateRecord {
    /// Ordinal plate number (`plater_id`).
    pub index: u32,

    /// G-code entry reference (`gcode_file`), empty when the plate was
    /// never sliced.
    pub gcode_file: String,
}

/// Strip a namespace prefix from an element name.
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|&b| b == b':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

/// Read the `key`/`value` attribute pair of a `<metadata .../>` element.
pub(crate) fn metadata_kv(e: &BytesStart) -> Result<Option<(String, String)>, quick_xml::Error> {
    let mut key = None;
    let mut value = String::new();

    for attr in e.attributes() {
        let attr = attr?;
        match attr.key.as_ref() {
            b"key" => key = Some(attr.unescape_value()?.into_owned()),
            b"value" => value = attr.unescape_value()?.into_owned(),
            _ => {}
        }
    }

    Ok(key.map(|k| (k, value)))
}

/// Parse all plate records out of `model_settings.config` content.
pub fn parse_plates(xml: &str) -> Result<Vec<PlateRecord>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut plates = Vec::new();
    let mut depth = 0usize;
    let mut plate_depth: Option<usize> = None;
    let mut index: Option<u32> = None;
    let mut gcode_file = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => {
                depth += 1;
                if plate_depth.is_none() && local_name(e.name().as_ref()) == b"plate" {
                    plate_depth = Some(depth);
                    index = None;
                    gcode_file.clear();
                } else if plate_depth == Some(depth.saturating_sub(1))
                    && local_name(e.name().as_ref()) == b"metadata"
                {
                    if let Some((k, v)) = metadata_kv(e)? {
                        record_plate_field(&k, &v, &mut index, &mut gcode_file);
                    }
                }
            }
            Event::Empty(ref e) => {
                if plate_depth == Some(depth) && local_name(e.name().as_ref()) == b"metadata" {
                    if let Some((k, v)) = metadata_kv(e)? {
                        record_plate_field(&k, &v, &mut index, &mut gcode_file);
                    }
                }
            }
            Event::End(_) => {
                if plate_depth == Some(depth) {
                    // Plates without a parseable plater_id cannot be
                    // addressed by the rewrite and are skipped.
                    if let Some(idx) = index.take() {
                        plates.push(PlateRecord {
                            index: idx,
                            gcode_file: gcode_file.clone(),
                        });
                    }
                    plate_depth = None;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(plates)
}

fn record_plate_field(key: &str, value: &str, index: &mut Option<u32>, gcode_file: &mut String) {
    match key {
        "plater_id" => {
            if let Ok(idx) = value.parse::<u32>() {
                *index = Some(idx);
            }
        }
        "gcode_file" => {
            *gcode_file = value.to_string();
        }
        _ => {}
    }
}

/// Find the manifest entry in a cleaned entry list.
pub fn find_manifest(entries: &[Entry]) -> Option<&Entry> {
    entries.iter().find(|e| e.name == MODEL_SETTINGS_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_PLATES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<config>
  <object id="2">
    <metadata key="name" value="Benchy"/>
  </object>
  <plate>
    <metadata key="plater_id" value="1"/>
    <metadata key="gcode_file" value=""/>
    <model_instance>
      <metadata key="object_id" value="2"/>
    </model_instance>
  </plate>
  <plate>
    <metadata key="plater_id" value="2"/>
    <metadata key="gcode_file" value="Metadata/plate_2.gcode"/>
    <metadata key="thumbnail_file" value="Metadata/plate_2.png"/>
  </plate>
</config>"#;

    #[test]
    fn test_parse_two_plates() {
        let plates = parse_plates(TWO_PLATES).unwrap();
        assert_eq!(
            plates,
            vec![
                PlateRecord {
                    index: 1,
                    gcode_file: String::new(),
                },
                PlateRecord {
                    index: 2,
                    gcode_file: "Metadata/plate_2.gcode".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_parse_ignores_model_instance_metadata() {
        // object_id of the nested model_instance must not leak into the
        // plate record fields.
        let plates = parse_plates(TWO_PLATES).unwrap();
        assert_eq!(plates[0].index, 1);
    }

    #[test]
    fn test_parse_no_plates() {
        let xml = r#"<config><object id="1"/></config>"#;
        assert!(parse_plates(xml).unwrap().is_empty());
    }

    #[test]
    fn test_parse_skips_plate_without_id() {
        let xml = r#"<config>
  <plate>
    <metadata key="gcode_file" value="Metadata/plate_1.gcode"/>
  </plate>
  <plate>
    <metadata key="plater_id" value="3"/>
    <metadata key="gcode_file" value="Metadata/plate_3.gcode"/>
  </plate>
</config>"#;
        let plates = parse_plates(xml).unwrap();
        assert_eq!(plates.len(), 1);
        assert_eq!(plates[0].index, 3);
    }

    #[test]
    fn test_parse_non_numeric_id_skipped() {
        let xml = r#"<config>
  <plate>
    <metadata key="plater_id" value="first"/>
    <metadata key="gcode_file" value="Metadata/plate_1.gcode"/>
  </plate>
</config>"#;
        assert!(parse_plates(xml).unwrap().is_empty());
    }

    #[test]
    fn test_parse_malformed_xml() {
        assert!(parse_plates("<config><plate></object></config>").is_err());
    }

    #[test]
    fn test_parse_expanded_metadata_elements() {
        // Some writers emit <metadata ...></metadata> instead of
        // self-closing elements.
        let xml = r#"<config>
  <plate>
    <metadata key="plater_id" value="4"></metadata>
    <metadata key="gcode_file" value="Metadata/plate_4.gcode"></metadata>
  </plate>
</config>"#;
        let plates = parse_plates(xml).unwrap();
        assert_eq!(
            plates,
            vec![PlateRecord {
                index: 4,
                gcode_file: "Metadata/plate_4.gcode".to_string(),
            }]
        );
    }
}
