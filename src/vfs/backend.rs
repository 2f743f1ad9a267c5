use super::entry::{DirEntry, EntryKind};
use crate::error::{Result, WadError};
use crate::stream::Stream;
use crate::wad::WadFile;
use std::path::Path;

/// Storage behind a [`super::Directory`].
///
/// `refresh` and `open_entry` are required; the rest default to
/// [`WadError::Unsupported`] (or a no-op for `commit` and `destroy`).
pub trait DirectoryBackend {
    /// The kind of container this backend presents
    fn kind(&self) -> EntryKind;

    /// Re-derive the entry list from ground truth. `previous` is the list
    /// being replaced, for backends that carry serial numbers across.
    fn refresh(&mut self, path: &Path, previous: &[DirEntry]) -> Result<Vec<DirEntry>>;

    /// Data stream for a leaf entry
    fn open_entry(&mut self, path: &Path, index: usize, entry: &DirEntry) -> Result<Stream>;

    fn remove(&mut self, path: &Path, index: usize, entry: &DirEntry) -> Result<()> {
        let _ = (path, index);
        Err(unsupported("remove", &entry.name))
    }

    fn rename(&mut self, path: &Path, index: usize, entry: &DirEntry, new_name: &str) -> Result<()> {
        let _ = (path, index, new_name);
        Err(unsupported("rename", &entry.name))
    }

    /// Create a subdirectory called `name`
    fn mkdir(&mut self, path: &Path, name: &str) -> Result<()> {
        let _ = path;
        Err(unsupported("mkdir", name))
    }

    fn swap(&mut self, a: usize, b: usize) -> Result<()> {
        let _ = (a, b);
        Err(WadError::Unsupported("reordering entries".to_string()))
    }

    /// Flush pending changes. Returns whether anything was written.
    fn commit(&mut self, message: &str) -> Result<bool> {
        let _ = message;
        Ok(false)
    }

    /// Human-readable description of `count` entries
    fn describe(&self, count: usize) -> String;

    fn is_read_only(&self) -> bool {
        false
    }

    /// Called once, when the owning directory is dropped
    fn destroy(&mut self) {}

    fn wad_file(&self) -> Option<&WadFile> {
        None
    }

    fn wad_file_mut(&mut self) -> Option<&mut WadFile> {
        None
    }
}

fn unsupported(operation: &str, name: &str) -> WadError {
    WadError::Unsupported(format!("{} of '{}'", operation, name))
}

/// "1 lump", "3 lumps"
pub(crate) fn count_noun(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("1 {}", singular)
    } else {
        format!("{} {}", count, plural)
    }
}
