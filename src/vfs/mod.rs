//! Directory abstraction
//!
//! A [`Directory`] is a list of named entries over a [`DirectoryBackend`]:
//! either a host directory ([`FsBackend`]) or a WAD archive
//! ([`WadBackend`]). Entries are identified by serial number, so
//! [`FileSet`] selections survive refreshes, and WAD directories can be
//! rearranged with [`Directory::move_entries`] and
//! [`Directory::sort_entries`].
//!
//! [`Vfs`] hands out shared [`DirectoryRef`] handles and makes sure a path
//! is never opened twice while a handle to it is alive.

mod backend;
mod directory;
mod entry;
mod fs;
mod reorder;
mod set;
mod transfer;
mod wad;

pub use backend::DirectoryBackend;
pub use directory::{Directory, DirectoryRef, Target};
pub use entry::{DirEntry, EntryKind};
pub use fs::FsBackend;
pub use reorder::{indexes_are_contiguous, is_move_noop, move_mapping};
pub use set::FileSet;
pub use transfer::{file_lump_name, lump_file_name, NEW_WAD_MESSAGE};
pub use wad::WadBackend;

use crate::config::WadConfig;
use crate::error::Result;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};
use tracing::{debug, warn};

/// Registry of open directories
#[derive(Debug, Default)]
pub struct Vfs {
    config: WadConfig,
    open: RefCell<HashMap<PathBuf, Weak<RefCell<Directory>>>>,
}

impl Vfs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: WadConfig) -> Self {
        Self {
            config,
            open: RefCell::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &WadConfig {
        &self.config
    }

    /// Open a directory or WAD, reusing the live handle for the same path
    pub fn open_dir<P: AsRef<Path>>(&self, path: P) -> Result<DirectoryRef> {
        let key = std::fs::canonicalize(path.as_ref())?;

        let existing = self.open.borrow().get(&key).and_then(Weak::upgrade);
        if let Some(dir) = existing {
            debug!("reusing open directory {}", key.display());
            return Ok(dir);
        }

        let dir = Directory::open_with(&key, self.config.clone())?.shared();
        let mut open = self.open.borrow_mut();
        open.retain(|_, weak| weak.strong_count() > 0);
        open.insert(key, Rc::downgrade(&dir));
        Ok(dir)
    }

    /// Open the parent of `dir` or one of its container entries
    pub fn open_subdirectory(&self, dir: &DirectoryRef, target: Target) -> Result<DirectoryRef> {
        let path = dir.borrow().subdirectory_path(target)?;
        self.open_dir(path)
    }

    /// Live directory handles
    pub fn open_count(&self) -> usize {
        self.open
            .borrow()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Refresh every live directory. Directories borrowed elsewhere are
    /// skipped.
    pub fn refresh_all(&self) -> Result<()> {
        let live: Vec<DirectoryRef> = self.open.borrow().values().filter_map(Weak::upgrade).collect();
        for dir in live {
            match dir.try_borrow_mut() {
                Ok(mut dir) => dir.refresh()?,
                Err(_) => warn!("directory busy; skipped refresh"),
            }
        }
        Ok(())
    }
}
