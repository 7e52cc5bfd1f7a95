//! Staged, all-or-nothing access to one zip container.
//!
//! # Design Choice: Memory-Based
//!
//! A handle reads every entry into memory and stages edits there. Nothing
//! touches disk until [`ArchiveHandle::commit`], which writes a complete new
//! archive to a temporary file next to the container and renames it into
//! place. Dropping a handle without committing discards staged edits, so a
//! failure anywhere in a multi-step mutation leaves the previous archive
//! byte-for-byte intact.
//!
//! Entries are kept in a `BTreeMap`, which fixes enumeration order to
//! lexicographic path order; the written archive uses the same order and a
//! fixed timestamp, so identical contents produce identical bytes.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime as ZipDateTime, ZipArchive, ZipWriter};

use crate::error::{ContainerError, ContainerResult};
use crate::naming::{is_meta_path, is_noise};

/// An open container with staged, uncommitted edits.
#[derive(Debug)]
pub struct ArchiveHandle {
    name: String,
    path: PathBuf,
    entries: BTreeMap<String, Vec<u8>>,
    dirty: bool,
    exists: bool,
}

impl ArchiveHandle {
    /// Load an existing container.
    pub(crate) fn open(name: &str, path: &Path) -> ContainerResult<Self> {
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ContainerError::NotFound {
                    name: name.to_string(),
                }
            } else {
                ContainerError::io(path, e)
            }
        })?;
        let entries = read_entries(BufReader::new(file), path)?;

        debug!(container = name, entries = entries.len(), "opened container");

        Ok(Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            entries,
            dirty: false,
            exists: true,
        })
    }

    /// Start a container that does not exist yet.
    pub(crate) fn new_container(name: &str, path: &Path) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            entries: BTreeMap::new(),
            dirty: true,
            exists: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All entry paths in lexicographic order.
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Payload entries: everything outside `META-INF`, minus filesystem noise.
    pub fn data_files(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries
            .iter()
            .filter(|(path, _)| !is_meta_path(path) && !is_noise(path))
            .map(|(path, bytes)| (path.as_str(), bytes.as_slice()))
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.entries.get(path).map(Vec::as_slice)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Stage a new or replacement entry.
    pub fn put(&mut self, path: impl Into<String>, bytes: Vec<u8>) {
        self.entries.insert(path.into(), bytes);
        self.dirty = true;
    }

    /// Stage removal of an entry.
    pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        let removed = self.entries.remove(path);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    /// Whether there are staged edits.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write staged edits atomically. A clean handle commits as a no-op.
    ///
    /// For a new container the final rename refuses to replace an existing
    /// file, so two racing creates cannot both succeed.
    pub fn commit(mut self) -> ContainerResult<()> {
        if !self.dirty {
            return Ok(());
        }

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut temp = NamedTempFile::new_in(&dir).map_err(|e| ContainerError::io(&dir, e))?;
        write_entries(temp.as_file_mut(), &self.entries)
            .map_err(|e| ContainerError::archive(temp.path(), e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| ContainerError::io(temp.path(), e))?;

        if self.exists {
            temp.persist(&self.path)
                .map_err(|e| ContainerError::io(&self.path, e.error))?;
        } else {
            temp.persist_noclobber(&self.path).map_err(|e| {
                if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                    ContainerError::NameConflict {
                        name: self.name.clone(),
                    }
                } else {
                    ContainerError::io(&self.path, e.error)
                }
            })?;
        }

        debug!(
            container = %self.name,
            entries = self.entries.len(),
            "committed container"
        );
        self.dirty = false;
        Ok(())
    }
}

impl Drop for ArchiveHandle {
    fn drop(&mut self) {
        if self.dirty {
            debug!(container = %self.name, "discarding uncommitted container edits");
        }
    }
}

fn read_entries<R: Read + Seek>(reader: R, path: &Path) -> ContainerResult<BTreeMap<String, Vec<u8>>> {
    let mut archive = ZipArchive::new(reader).map_err(|e| ContainerError::archive(path, e))?;
    let mut entries = BTreeMap::new();

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| ContainerError::archive(path, e))?;
        if entry.is_dir() {
            continue;
        }

        let name = normalize_entry_name(entry.name()).ok_or_else(|| ContainerError::Archive {
            path: path.display().to_string(),
            message: format!("unsafe entry name: {}", entry.name()),
        })?;

        let mut bytes = Vec::with_capacity(entry.size().min(64 * 1024 * 1024) as usize);
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| ContainerError::io(path, e))?;
        entries.insert(name, bytes);
    }

    Ok(entries)
}

/// Strip a leading `/`, reject traversal and empty segments.
fn normalize_entry_name(raw: &str) -> Option<String> {
    let name = raw.trim_start_matches('/');
    if name.is_empty() || name.contains('\\') {
        return None;
    }
    if name.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
        return None;
    }
    Some(name.to_string())
}

fn write_entries<W: Write + Seek>(
    writer: W,
    entries: &BTreeMap<String, Vec<u8>>,
) -> zip::result::ZipResult<()> {
    let mut zip = ZipWriter::new(writer);
    let timestamp = zip_timestamp();

    for (name, bytes) in entries {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(timestamp)
            .unix_permissions(0o644);
        zip.start_file(name.as_str(), options)?;
        zip.write_all(bytes)?;
    }

    zip.finish()?;
    Ok(())
}

fn zip_timestamp() -> ZipDateTime {
    ZipDateTime::from_date_and_time(1980, 1, 1, 0, 0, 0).unwrap_or_default()
}
