//! Bundle reader for opening project archives.
//!
//! Reads the full entry list into memory; a single conversion transforms the
//! list in memory and writes it back out, so there is no streaming API.

use crate::{BundleError, Result};
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

/// One named entry of a bundle: path within the archive plus raw content.
///
/// Directory placeholders appear as entries with a trailing `/` and empty
/// data, exactly as stored by the zip container; `repair` drops them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub data: Vec<u8>,
}

impl Entry {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Whether this entry is a directory placeholder rather than a file.
    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }
}

/// Read all entries of a bundle file, in archive order.
pub fn read_path(path: &Path) -> Result<Vec<Entry>> {
    let file = File::open(path)?;
    read_archive(file)
}

/// Read all entries of a bundle held in memory.
pub fn read_bytes(bytes: Vec<u8>) -> Result<Vec<Entry>> {
    read_archive(Cursor::new(bytes))
}

fn read_archive<R: Read + Seek>(reader: R) -> Result<Vec<Entry>> {
    let mut archive = ZipArchive::new(reader)?;
    let mut entries = Vec::with_capacity(archive.len());

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let name = file.name().to_string();

        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)?;

        entries.push(Entry { name, data });
    }

    debug!(entries = entries.len(), "Bundle read");

    Ok(entries)
}
