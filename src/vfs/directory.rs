use super::backend::DirectoryBackend;
use super::entry::{DirEntry, EntryKind};
use super::fs::FsBackend;
use super::set::FileSet;
use super::wad::WadBackend;
use crate::config::WadConfig;
use crate::error::{Result, WadError};
use crate::stream::Stream;
use crate::wad::WadFile;
use glob::{MatchOptions, Pattern};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

/// Shared handle to a directory. The backend is destroyed when the last
/// handle is dropped.
pub type DirectoryRef = Rc<RefCell<Directory>>;

/// What to open with [`Directory::open_subdirectory`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The containing directory
    Parent,
    /// The entry at this index
    Entry(usize),
}

/// A list of entries over some backend: a filesystem directory or a WAD
pub struct Directory {
    path: PathBuf,
    entries: Vec<DirEntry>,
    config: WadConfig,
    backend: Box<dyn DirectoryBackend>,
}

impl Directory {
    /// Wrap a backend and load its entries
    pub fn new<P: Into<PathBuf>>(
        path: P,
        backend: Box<dyn DirectoryBackend>,
        config: WadConfig,
    ) -> Result<Self> {
        let mut dir = Self {
            path: path.into(),
            entries: Vec::new(),
            config,
            backend,
        };
        dir.refresh()?;
        Ok(dir)
    }

    /// Open a filesystem directory, or a WAD file as a directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, WadConfig::default())
    }

    pub fn open_with<P: AsRef<Path>>(path: P, config: WadConfig) -> Result<Self> {
        let path = path.as_ref();
        if std::fs::metadata(path)?.is_dir() {
            Self::open_fs(path, config)
        } else {
            Self::open_wad(path, config)
        }
    }

    pub fn open_fs<P: AsRef<Path>>(path: P, config: WadConfig) -> Result<Self> {
        let backend = FsBackend::new(config.show_hidden);
        Self::new(path.as_ref(), Box::new(backend), config)
    }

    pub fn open_wad<P: AsRef<Path>>(path: P, config: WadConfig) -> Result<Self> {
        let backend = WadBackend::open(path.as_ref(), config.clone())?;
        Self::new(path.as_ref(), Box::new(backend), config)
    }

    /// Move into a shared handle
    pub fn shared(self) -> DirectoryRef {
        Rc::new(RefCell::new(self))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> EntryKind {
        self.backend.kind()
    }

    pub fn is_read_only(&self) -> bool {
        self.backend.is_read_only()
    }

    pub fn config(&self) -> &WadConfig {
        &self.config
    }

    pub fn entries(&self) -> &[DirEntry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&DirEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry_checked(&self, index: usize) -> Result<&DirEntry> {
        self.entries
            .get(index)
            .ok_or_else(|| WadError::out_of_range(index, self.entries.len()))
    }

    /// Reload entries from the backend
    pub fn refresh(&mut self) -> Result<()> {
        self.entries = self.backend.refresh(&self.path, &self.entries)?;
        debug!("refreshed {}: {} entries", self.path.display(), self.entries.len());
        Ok(())
    }

    /// Data stream for the entry at `index`
    pub fn open_entry(&mut self, index: usize) -> Result<Stream> {
        let entry = self.entry_checked(index)?.clone();
        self.backend.open_entry(&self.path, index, &entry)
    }

    /// Path of the directory `target` refers to
    pub fn subdirectory_path(&self, target: Target) -> Result<PathBuf> {
        match target {
            Target::Parent => self
                .path
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| WadError::NotFound(format!("parent of {}", self.path.display()))),
            Target::Entry(index) => {
                let entry = self.entry_checked(index)?;
                if !entry.kind.is_container() {
                    return Err(WadError::Unsupported(format!(
                        "'{}' is not a directory",
                        entry.name
                    )));
                }
                Ok(self.path.join(&entry.name))
            }
        }
    }

    /// Open the parent or a container entry as a new directory
    pub fn open_subdirectory(&self, target: Target) -> Result<Directory> {
        let path = self.subdirectory_path(target)?;
        Directory::open_with(path, self.config.clone())
    }

    /// Remove one entry
    pub fn remove(&mut self, index: usize) -> Result<()> {
        let entry = self.entry_checked(index)?.clone();
        self.backend.remove(&self.path, index, &entry)?;
        self.entries.remove(index);
        Ok(())
    }

    /// Remove every entry in `set`. Returns how many were removed.
    pub fn remove_set(&mut self, set: &FileSet) -> Result<usize> {
        let mut removed = 0;
        for serial in set.iter() {
            if let Some(index) = self.find_by_serial(serial) {
                self.remove(index)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Rename an entry, keeping its serial number
    pub fn rename(&mut self, index: usize, new_name: &str) -> Result<()> {
        let entry = self.entry_checked(index)?.clone();
        self.backend.rename(&self.path, index, &entry, new_name)?;
        self.entries[index].name = new_name.to_string();
        self.refresh()
    }

    /// Create a subdirectory. Returns its index after refreshing.
    pub fn mkdir(&mut self, name: &str) -> Result<usize> {
        self.backend.mkdir(&self.path, name)?;
        self.refresh()?;
        self.find_by_name(name)
            .ok_or_else(|| WadError::NotFound(name.to_string()))
    }

    /// Exchange two entries. Only ordered backends support this.
    pub fn swap_entries(&mut self, a: usize, b: usize) -> Result<()> {
        self.entry_checked(a)?;
        self.entry_checked(b)?;
        self.backend.swap(a, b)?;
        self.entries.swap(a, b);
        Ok(())
    }

    /// Flush pending backend changes under a descriptive message
    pub fn commit(&mut self, message: &str) -> Result<bool> {
        let written = self.backend.commit(message)?;
        self.refresh()?;
        Ok(written)
    }

    /// "1 lump", "4 files", ...
    pub fn describe(&self, count: usize) -> String {
        self.backend.describe(count)
    }

    /// `'NAME'` for a single entry, otherwise a count
    pub fn describe_set(&self, set: &FileSet) -> String {
        if set.len() == 1 {
            if let Some((_, entry)) = self.iter_set(set).next() {
                return format!("'{}'", entry.name);
            }
        }
        self.describe(set.len())
    }

    pub fn find_by_serial(&self, serial: u64) -> Option<usize> {
        self.entries.iter().position(|e| e.serial == serial)
    }

    /// Exact, case-insensitive
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.name.eq_ignore_ascii_case(name))
    }

    /// First entry at or after `start` whose name contains `needle`
    /// (case-insensitive)
    pub fn search(&self, needle: &str, start: usize) -> Option<usize> {
        let needle = needle.to_ascii_lowercase();
        self.entries
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, e)| e.name.to_ascii_lowercase().contains(&needle))
            .map(|(i, _)| i)
    }

    /// Entries in `set`, in directory order
    pub fn iter_set<'a>(
        &'a self,
        set: &'a FileSet,
    ) -> impl Iterator<Item = (usize, &'a DirEntry)> + 'a {
        self.entries
            .iter()
            .enumerate()
            .filter(move |(_, e)| set.contains(e.serial))
    }

    /// Ascending indexes of the entries in `set`
    pub fn indexes_for_set(&self, set: &FileSet) -> Vec<usize> {
        self.iter_set(set).map(|(i, _)| i).collect()
    }

    /// Add every entry matching a glob pattern (case-insensitive).
    /// Returns the index of the first entry that was not already selected.
    pub fn add_glob_to_set(&self, set: &mut FileSet, pattern: &str) -> Result<Option<usize>> {
        let pattern = Pattern::new(pattern)?;
        let options = MatchOptions {
            case_sensitive: false,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };

        let mut first = None;
        for (i, entry) in self.entries.iter().enumerate() {
            if pattern.matches_with(&entry.name, options) && set.add(entry.serial) && first.is_none() {
                first = Some(i);
            }
        }
        Ok(first)
    }

    pub fn wad_file(&self) -> Option<&WadFile> {
        self.backend.wad_file()
    }

    pub fn wad_file_mut(&mut self) -> Option<&mut WadFile> {
        self.backend.wad_file_mut()
    }

    fn history_wad(&mut self, operation: &str) -> Result<&mut WadFile> {
        self.backend
            .wad_file_mut()
            .ok_or_else(|| WadError::Unsupported(format!("{} outside a WAD", operation)))
    }

    /// Undo the last commit. Returns the first changed index.
    ///
    /// Uncommitted moves or renames must be committed or rolled back first.
    pub fn undo(&mut self) -> Result<Option<usize>> {
        let changed = self.history_wad("undo")?.undo()?;
        self.refresh()?;
        Ok(changed)
    }

    pub fn redo(&mut self) -> Result<Option<usize>> {
        let changed = self.history_wad("redo")?.redo()?;
        self.refresh()?;
        Ok(changed)
    }

    /// Discard uncommitted changes
    pub fn rollback(&mut self) -> Result<Option<usize>> {
        let changed = self.history_wad("rollback")?.rollback()?;
        self.refresh()?;
        Ok(changed)
    }

    pub fn can_undo(&self) -> usize {
        self.wad_file().map_or(0, WadFile::can_undo)
    }

    pub fn can_redo(&self) -> usize {
        self.wad_file().map_or(0, WadFile::can_redo)
    }

    pub fn last_commit_message(&self) -> Option<&str> {
        self.wad_file().and_then(WadFile::last_commit_message)
    }

    pub fn clear_history(&mut self) {
        if let Some(wad) = self.backend.wad_file_mut() {
            wad.clear_history();
        }
    }
}

impl Drop for Directory {
    fn drop(&mut self) {
        debug!("closing directory {}", self.path.display());
        self.backend.destroy();
    }
}

impl std::fmt::Debug for Directory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Directory")
            .field("path", &self.path)
            .field("kind", &self.kind())
            .field("entries", &self.entries.len())
            .finish()
    }
}
