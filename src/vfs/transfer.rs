//! Copying selections between directories
//!
//! A WAD destination receives entries as new lumps, a host directory as new
//! files. Either way the caller gets back a [`FileSet`] naming the copies in
//! the destination, ready to be tagged there.
//!
//! Lumps exported to disk become `name.lmp` in lower case, with `\` (legal
//! in sprite names) written as `^`. Files imported into a WAD take their
//! stem as the lump name.

use super::directory::Directory;
use super::entry::{DirEntry, EntryKind};
use super::fs::check_file_name;
use super::set::FileSet;
use crate::error::{Result, WadError};
use crate::stream::{self, Stream};
use crate::wad::WadFile;
use std::fs::{self, File};
use std::path::Path;
use tracing::{debug, info, warn};

/// Commit message used by [`Directory::create_wad`]
pub const NEW_WAD_MESSAGE: &str = "new WAD";

/// File name a lump is exported under
pub fn lump_file_name(lump: &str) -> String {
    format!("{}.lmp", lump.to_ascii_lowercase().replace(['\\', '/'], "^"))
}

/// Lump name a file is imported under
pub fn file_lump_name(file: &str) -> String {
    let stem = Path::new(file)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.to_string());
    stem.replace('^', "\\")
}

impl Directory {
    /// Copy the entries of `set` (found in `from`) into this directory.
    ///
    /// A WAD destination gets new lumps before `insert_before` and the copy
    /// is committed as one revision; if any copy fails the WAD is rolled
    /// back. A host directory gets one file per entry and ignores
    /// `insert_before`. Returns the serials of the new entries.
    ///
    /// `from` must be a different directory from this one.
    pub fn import_set(
        &mut self,
        from: &mut Directory,
        set: &FileSet,
        insert_before: usize,
    ) -> Result<FileSet> {
        let copied = self.copy_set(from, set, insert_before)?;
        if self.kind() == EntryKind::Wad {
            let message = format!("import of {}", from.describe_set(set));
            self.commit(&message)?;
        }
        info!(
            "copied {} from {} to {}",
            from.describe_set(set),
            from.path().display(),
            self.path().display()
        );
        Ok(copied)
    }

    /// Copy the entries of `set` from this directory to the end of `to`
    pub fn export_set(&mut self, to: &mut Directory, set: &FileSet) -> Result<FileSet> {
        let end = to.len();
        to.import_set(self, set, end)
    }

    /// Create a new WAD called `name` in this host directory, filled with
    /// the entries of `set` from `from`. A `.wad` extension is added when
    /// `name` has none. Returns the index of the new WAD's entry.
    pub fn create_wad(&mut self, name: &str, from: &mut Directory, set: &FileSet) -> Result<usize> {
        if self.kind() != EntryKind::Directory {
            return Err(WadError::Unsupported(format!(
                "creating a WAD inside {}",
                self.path().display()
            )));
        }
        check_file_name(name)?;
        let name = if name.contains('.') {
            name.to_string()
        } else {
            format!("{}.wad", name)
        };
        let path = self.path().join(&name);
        if path.exists() {
            return Err(WadError::Unsupported(format!("'{}' already exists", name)));
        }

        WadFile::create(&path)?;
        let filled = Directory::open_wad(&path, self.config().clone()).and_then(|mut wad| {
            wad.copy_set(from, set, 0)?;
            wad.commit(NEW_WAD_MESSAGE)
        });
        if let Err(e) = filled {
            if let Err(cleanup) = fs::remove_file(&path) {
                warn!("could not remove {}: {}", path.display(), cleanup);
            }
            return Err(e);
        }

        self.refresh()?;
        self.find_by_name(&name)
            .ok_or_else(|| WadError::NotFound(name.clone()))
    }

    /// Entries of `set` in `from`, in directory order, rejecting containers
    fn selected_leaves(from: &Directory, set: &FileSet) -> Result<Vec<(usize, DirEntry)>> {
        let selected: Vec<(usize, DirEntry)> = from
            .iter_set(set)
            .map(|(i, entry)| (i, entry.clone()))
            .collect();
        if selected.is_empty() {
            return Err(WadError::NotFound("no entries selected".to_string()));
        }
        if let Some((_, entry)) = selected.iter().find(|(_, e)| e.kind == EntryKind::Directory) {
            return Err(WadError::Unsupported(format!(
                "copying directory '{}'",
                entry.name
            )));
        }
        Ok(selected)
    }

    fn copy_set(&mut self, from: &mut Directory, set: &FileSet, insert_before: usize) -> Result<FileSet> {
        let selected = Self::selected_leaves(from, set)?;
        if from.path() == self.path() {
            return Err(WadError::Unsupported(format!(
                "copying {} onto itself",
                self.path().display()
            )));
        }
        match self.kind() {
            EntryKind::Wad => self.copy_into_wad(from, &selected, insert_before),
            EntryKind::Directory => self.copy_into_host(from, &selected),
            kind => Err(WadError::Unsupported(format!("copying into a {:?}", kind))),
        }
    }

    fn copy_into_wad(
        &mut self,
        from: &mut Directory,
        selected: &[(usize, DirEntry)],
        insert_before: usize,
    ) -> Result<FileSet> {
        let wad = self
            .wad_file_mut()
            .ok_or_else(|| WadError::Unsupported("copying into a WAD without one".to_string()))?;
        if wad.need_commit() {
            return Err(WadError::UncommittedChanges);
        }
        let at = insert_before.min(wad.num_lumps());

        let mut copied = FileSet::new();
        let mut failure = None;
        for (offset, (index, entry)) in selected.iter().enumerate() {
            let name = match entry.kind {
                EntryKind::Lump => entry.name.clone(),
                _ => file_lump_name(&entry.name),
            };
            match copy_one_lump(from, *index, wad, at + offset, &name) {
                Ok(serial) => {
                    copied.add(serial);
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        if let Some(e) = failure {
            warn!("copy into {} failed, rolling back: {}", self.path().display(), e);
            self.rollback()?;
            return Err(e);
        }
        debug!("inserted {} lumps at {}", copied.len(), at);
        Ok(copied)
    }

    fn copy_into_host(&mut self, from: &mut Directory, selected: &[(usize, DirEntry)]) -> Result<FileSet> {
        let mut written = Vec::with_capacity(selected.len());
        for (index, entry) in selected {
            let name = match entry.kind {
                EntryKind::Lump => lump_file_name(&entry.name),
                _ => entry.name.clone(),
            };
            let mut src = from.open_entry(*index)?;
            let mut dst = Stream::wrap_file(File::create(self.path().join(&name))?);
            stream::copy(&mut src, &mut dst)?;
            dst.sync()?;
            dst.close()?;
            written.push(name);
        }

        self.refresh()?;
        Ok(written
            .iter()
            .filter_map(|name| self.find_by_name(name))
            .filter_map(|i| self.entry(i).map(|e| e.serial))
            .collect())
    }
}

/// Copy entry `index` of `from` into a new lump at `at`. Returns its serial.
fn copy_one_lump(
    from: &mut Directory,
    index: usize,
    wad: &mut WadFile,
    at: usize,
    name: &str,
) -> Result<u64> {
    let mut src = from.open_entry(index)?;
    wad.insert_entries(at, 1)?;
    wad.set_lump_name(at, name)?;
    let mut dst = wad.open_lump_for_rewrite(at)?;
    stream::copy(&mut src, &mut dst)?;
    dst.close()?;
    wad.entry(at)
        .map(|e| e.serial())
        .ok_or_else(|| WadError::out_of_range(at, wad.num_lumps()))
}
