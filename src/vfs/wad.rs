use super::backend::{count_noun, DirectoryBackend};
use super::entry::{DirEntry, EntryKind};
use crate::config::WadConfig;
use crate::error::{Result, WadError};
use crate::stream::Stream;
use crate::wad::WadFile;
use std::path::Path;
use tracing::warn;

/// A WAD archive presented as a directory of lumps.
///
/// Entries carry the archive's own serial numbers, so identity follows
/// lumps through swaps, inserts and undo.
#[derive(Debug)]
pub struct WadBackend {
    wad: WadFile,
}

impl WadBackend {
    pub fn new(wad: WadFile) -> Self {
        Self { wad }
    }

    pub fn open<P: AsRef<Path>>(path: P, config: WadConfig) -> Result<Self> {
        Ok(Self::new(WadFile::open_with(path, config)?))
    }

    /// Resolve `index` and make sure it still names `entry`
    fn checked_index(&self, index: usize, entry: &DirEntry) -> Result<usize> {
        match self.wad.entry(index) {
            Some(lump) if lump.serial() == entry.serial => Ok(index),
            _ => self
                .wad
                .find_by_serial(entry.serial)
                .ok_or_else(|| WadError::NotFound(entry.name.clone())),
        }
    }
}

impl DirectoryBackend for WadBackend {
    fn kind(&self) -> EntryKind {
        EntryKind::Wad
    }

    fn refresh(&mut self, _path: &Path, _previous: &[DirEntry]) -> Result<Vec<DirEntry>> {
        Ok(self
            .wad
            .entries()
            .iter()
            .map(|lump| DirEntry {
                name: lump.name(),
                kind: EntryKind::Lump,
                size: Some(lump.size() as u64),
                serial: lump.serial(),
            })
            .collect())
    }

    fn open_entry(&mut self, _path: &Path, index: usize, entry: &DirEntry) -> Result<Stream> {
        let index = self.checked_index(index, entry)?;
        self.wad.open_lump(index)
    }

    fn remove(&mut self, _path: &Path, index: usize, entry: &DirEntry) -> Result<()> {
        let index = self.checked_index(index, entry)?;
        self.wad.delete_entry(index)
    }

    fn rename(&mut self, _path: &Path, index: usize, entry: &DirEntry, new_name: &str) -> Result<()> {
        let index = self.checked_index(index, entry)?;
        self.wad.set_lump_name(index, new_name)
    }

    fn swap(&mut self, a: usize, b: usize) -> Result<()> {
        self.wad.swap_entries(a, b)
    }

    fn commit(&mut self, message: &str) -> Result<bool> {
        self.wad.commit_changes(message)
    }

    fn describe(&self, count: usize) -> String {
        count_noun(count, "lump", "lumps")
    }

    fn is_read_only(&self) -> bool {
        self.wad.is_read_only()
    }

    fn destroy(&mut self) {
        if let Err(e) = self.wad.close() {
            warn!("error closing WAD directory: {}", e);
        }
    }

    fn wad_file(&self) -> Option<&WadFile> {
        Some(&self.wad)
    }

    fn wad_file_mut(&mut self) -> Option<&mut WadFile> {
        Some(&mut self.wad)
    }
}
