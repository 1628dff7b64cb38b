//! Shared fixtures: synthetic project bundles built with the real
//! container writer, shaped like slicer exports.
#![allow(dead_code)]

use mp_bundle::BundleWriter;
use std::path::{Path, PathBuf};

pub const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
 <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
 <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
 <Default Extension="png" ContentType="image/png"/>
 <Default Extension="gcode" ContentType="text/x.gcode"/>
</Types>
"#;

/// State of one plate's G-code in the fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gcode {
    /// Manifest reference empty; plate never sliced.
    None,
    /// Manifest references a file that is not in the archive.
    Missing,
    /// Referenced file exists but is zero-length.
    Empty,
    /// Referenced file exists with toolpath content.
    Present,
}

#[derive(Debug, Clone, Copy)]
pub struct Plate {
    pub index: u32,
    pub gcode: Gcode,
}

impl Plate {
    pub fn new(index: u32, gcode: Gcode) -> Self {
        Self { index, gcode }
    }
}

/// Entry list of a realistic multi-plate project bundle.
pub fn bundle_entries(plates: &[Plate]) -> Vec<(String, Vec<u8>)> {
    // Cover assets follow the exported plate, falling back to plate 1.
    let cover = plates
        .iter()
        .find(|p| p.gcode == Gcode::Present)
        .map(|p| p.index)
        .unwrap_or(1);

    let mut entries: Vec<(String, Vec<u8>)> = vec![
        (
            "[Content_Types].xml".to_string(),
            CONTENT_TYPES.as_bytes().to_vec(),
        ),
        ("_rels/.rels".to_string(), cover_rels(cover).into_bytes()),
        (
            "3D/3dmodel.model".to_string(),
            model_xml(cover).into_bytes(),
        ),
        (
            "Metadata/model_settings.config".to_string(),
            model_settings(plates).into_bytes(),
        ),
        (
            "Metadata/_rels/model_settings.config.rels".to_string(),
            settings_rels(cover).into_bytes(),
        ),
        (
            "Metadata/slice_info.config".to_string(),
            slice_info(plates).into_bytes(),
        ),
    ];

    for plate in plates {
        let n = plate.index;
        entries.push((format!("Metadata/plate_{n}.png"), b"png".to_vec()));
        entries.push((format!("Metadata/plate_{n}_small.png"), b"png".to_vec()));
        entries.push((format!("Metadata/plate_no_light_{n}.png"), b"png".to_vec()));
        entries.push((format!("Metadata/top_{n}.png"), b"png".to_vec()));
        entries.push((format!("Metadata/pick_{n}.png"), b"png".to_vec()));
        entries.push((format!("Metadata/plate_{n}.json"), b"{}".to_vec()));

        match plate.gcode {
            Gcode::Present => {
                entries.push((
                    format!("Metadata/plate_{n}.gcode"),
                    format!(";plate {n}\nG28\nG1 X10\n").into_bytes(),
                ));
                entries.push((
                    format!("Metadata/plate_{n}.gcode.md5"),
                    b"d41d8cd98f00b204e9800998ecf8427e".to_vec(),
                ));
            }
            Gcode::Empty => {
                entries.push((format!("Metadata/plate_{n}.gcode"), Vec::new()));
            }
            Gcode::Missing | Gcode::None => {}
        }
    }

    entries
}

/// Write an arbitrary entry list as a zip bundle.
pub fn write_entries(path: &Path, entries: &[(String, Vec<u8>)]) {
    let mut writer = BundleWriter::new();
    for (name, data) in entries {
        writer.add_entry(name.clone(), data.clone()).expect("add entry");
    }
    writer.write(path).expect("write fixture bundle");
}

/// Write a realistic bundle and return its path.
pub fn write_bundle(dir: &Path, file_name: &str, plates: &[Plate]) -> PathBuf {
    let path = dir.join(file_name);
    write_entries(&path, &bundle_entries(plates));
    path
}

fn model_settings(plates: &[Plate]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<config>
  <object id="2">
    <metadata key="name" value="Benchy"/>
    <part id="1" subtype="normal_part">
      <metadata key="name" value="Benchy.stl"/>
    </part>
  </object>
"#,
    );

    for plate in plates {
        let n = plate.index;
        let gcode_ref = match plate.gcode {
            Gcode::None => String::new(),
            _ => format!("Metadata/plate_{n}.gcode"),
        };
        xml.push_str(&format!(
            r#"  <plate>
    <metadata key="plater_id" value="{n}"/>
    <metadata key="plater_name" value=""/>
    <metadata key="locked" value="false"/>
    <metadata key="thumbnail_file" value="Metadata/plate_{n}.png"/>
    <metadata key="thumbnail_no_light_file" value="Metadata/plate_no_light_{n}.png"/>
    <metadata key="top_file" value="Metadata/top_{n}.png"/>
    <metadata key="pick_file" value="Metadata/pick_{n}.png"/>
    <metadata key="pattern_bbox_file" value="Metadata/plate_{n}.json"/>
    <metadata key="gcode_file" value="{gcode_ref}"/>
    <model_instance>
      <metadata key="object_id" value="2"/>
      <metadata key="instance_id" value="0"/>
    </model_instance>
  </plate>
"#
        ));
    }

    xml.push_str("</config>\n");
    xml
}

fn slice_info(plates: &[Plate]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<config>
  <header>
    <header_item key="X-BBL-Client-Type" value="slicer"/>
  </header>
"#,
    );

    for plate in plates {
        let n = plate.index;
        xml.push_str(&format!(
            r##"  <plate>
    <metadata key="index" value="{n}"/>
    <metadata key="prediction" value="5217"/>
    <metadata key="weight" value="12.34"/>
    <filament id="1" type="PLA" color="#FFFFFF" used_m="4.09" used_g="12.34"/>
  </plate>
"##
        ));
    }

    xml.push_str("</config>\n");
    xml
}

fn cover_rels(cover: u32) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
 <Relationship Target="/3D/3dmodel.model" Id="rel-1" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
 <Relationship Target="/Metadata/plate_{cover}.png" Id="rel-2" Type="http://schemas.bambulab.com/package/2021/cover-thumbnail-middle"/>
 <Relationship Target="/Metadata/plate_{cover}_small.png" Id="rel-4" Type="http://schemas.bambulab.com/package/2021/cover-thumbnail-small"/>
</Relationships>
"#
    )
}

fn settings_rels(cover: u32) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
 <Relationship Target="/Metadata/plate_{cover}.gcode" Id="rel-1" Type="http://schemas.bambulab.com/package/2021/gcode"/>
</Relationships>
"#
    )
}

fn model_xml(cover: u32) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xml:lang="en-US" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02">
 <metadata name="Application">BambuStudio-01.09.00.70</metadata>
 <metadata name="Thumbnail_Middle">/Metadata/plate_{cover}.png</metadata>
 <metadata name="Thumbnail_Small">/Metadata/plate_{cover}_small.png</metadata>
 <resources>
  <object id="2" type="model">
   <mesh>
    <vertices>
     <vertex x="0" y="0" z="0"/>
     <vertex x="1" y="0" z="0"/>
     <vertex x="0" y="1" z="1"/>
    </vertices>
    <triangles>
     <triangle v1="0" v2="1" v3="2"/>
    </triangles>
   </mesh>
  </object>
 </resources>
 <build>
  <item objectid="2" transform="1 0 0 0 1 0 0 0 1 128 128 0"/>
 </build>
</model>
"#
    )
}
