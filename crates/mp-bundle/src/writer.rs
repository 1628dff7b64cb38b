//! Bundle writer for assembling output archives.
//!
//! Output is staged to a temporary file in the destination directory and
//! moved into place only after the archive is fully serialized, so a crash
//! mid-write never leaves a partial bundle behind. The move refuses to
//! clobber an existing file; callers pick a free name first.

use crate::{BundleError, Result};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

/// Builder for an output bundle. Entries are written in insertion order,
/// which keeps the output archive laid out like its input.
#[derive(Debug, Default)]
pub struct BundleWriter {
    entries: Vec<(String, Vec<u8>)>,
    names: BTreeSet<String>,
}

impl BundleWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one entry. Names must be unique and archive-relative.
    pub fn add_entry(&mut self, name: impl Into<String>, data: Vec<u8>) -> Result<()> {
        let name = name.into();
        if name.is_empty() || name.starts_with('/') {
            return Err(BundleError::InvalidEntryName(name));
        }
        if !self.names.insert(name.clone()) {
            return Err(BundleError::DuplicateEntry(name));
        }

        debug!(name = %name, bytes = data.len(), "Added entry");
        self.entries.push((name, data));
        Ok(())
    }

    /// Whether an entry with this name has been added.
    pub fn has_entry(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total uncompressed payload size.
    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|(_, data)| data.len() as u64).sum()
    }

    /// Serialize the bundle to a byte vector (for in-memory use and tests).
    pub fn write_to_vec(&self) -> Result<Vec<u8>> {
        if self.entries.is_empty() {
            return Err(BundleError::EmptyBundle);
        }

        let mut buffer = std::io::Cursor::new(Vec::new());
        self.serialize_into(&mut buffer)?;
        Ok(buffer.into_inner())
    }

    /// Write the bundle atomically to `path`.
    ///
    /// The archive is serialized to a temporary sibling file, then persisted
    /// with rename semantics. Fails without touching `path` if a file
    /// already exists there.
    pub fn write(&self, path: &Path) -> Result<()> {
        if self.entries.is_empty() {
            return Err(BundleError::EmptyBundle);
        }

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let tmp = tempfile::Builder::new()
            .prefix(".bundle-")
            .suffix(".tmp")
            .tempfile_in(dir)?;

        self.serialize_into(tmp.as_file())?;

        tmp.persist_noclobber(path)
            .map_err(|e| BundleError::Persist {
                path: path.display().to_string(),
                source: e.error,
            })?;

        info!(
            path = %path.display(),
            entries = self.entries.len(),
            bytes = self.total_bytes(),
            "Bundle written"
        );

        Ok(())
    }

    fn serialize_into<W: Write + std::io::Seek>(&self, writer: W) -> Result<()> {
        let mut zip = ZipWriter::new(writer);

        let options: FileOptions<'_, ()> = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);

        for (name, data) in &self.entries {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(data)?;
        }

        zip.finish()?;
        Ok(())
    }
}
