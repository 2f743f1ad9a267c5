use super::backend::{count_noun, DirectoryBackend};
use super::entry::{DirEntry, EntryKind};
use crate::error::{Result, WadError};
use crate::stream::Stream;
use crate::wad::{has_wad_extension, next_serial};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// A directory on the host filesystem
#[derive(Debug, Default)]
pub struct FsBackend {
    show_hidden: bool,
}

impl FsBackend {
    pub fn new(show_hidden: bool) -> Self {
        Self { show_hidden }
    }
}

/// Reject names that would escape the directory
pub(crate) fn check_file_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(WadError::Unsupported(format!("invalid file name '{}'", name)));
    }
    Ok(())
}

/// Directories first, then case-insensitive name order
fn listing_order(a: &DirEntry, b: &DirEntry) -> Ordering {
    let a_dir = a.kind == EntryKind::Directory;
    let b_dir = b.kind == EntryKind::Directory;
    b_dir.cmp(&a_dir).then_with(|| {
        a.name
            .bytes()
            .map(|c| c.to_ascii_lowercase())
            .cmp(b.name.bytes().map(|c| c.to_ascii_lowercase()))
    })
}

impl DirectoryBackend for FsBackend {
    fn kind(&self) -> EntryKind {
        EntryKind::Directory
    }

    fn refresh(&mut self, path: &Path, previous: &[DirEntry]) -> Result<Vec<DirEntry>> {
        // Serial numbers follow names across refreshes
        let mut serials: HashMap<&str, u64> = previous
            .iter()
            .map(|e| (e.name.as_str(), e.serial))
            .collect();

        let mut entries = Vec::new();
        for dirent in fs::read_dir(path)? {
            let dirent = dirent?;
            let name = dirent.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') && !self.show_hidden {
                continue;
            }

            let file_type = dirent.file_type()?;
            let (kind, size) = if file_type.is_dir() {
                (EntryKind::Directory, None)
            } else {
                let kind = if has_wad_extension(&name) {
                    EntryKind::Wad
                } else {
                    EntryKind::File
                };
                (kind, dirent.metadata().ok().map(|m| m.len()))
            };

            let serial = serials.remove(name.as_str()).unwrap_or_else(next_serial);
            entries.push(DirEntry {
                name,
                kind,
                size,
                serial,
            });
        }

        entries.sort_by(listing_order);
        debug!("listed {}: {} entries", path.display(), entries.len());
        Ok(entries)
    }

    fn open_entry(&mut self, path: &Path, _index: usize, entry: &DirEntry) -> Result<Stream> {
        if entry.kind == EntryKind::Directory {
            return Err(WadError::Unsupported(format!(
                "'{}' is a directory",
                entry.name
            )));
        }
        let file_path = path.join(&entry.name);
        let stream = match Stream::open_file(&file_path, true) {
            Ok(stream) => stream,
            Err(_) => Stream::open_file(&file_path, false)?,
        };
        Ok(stream)
    }

    fn remove(&mut self, path: &Path, _index: usize, entry: &DirEntry) -> Result<()> {
        let target = path.join(&entry.name);
        if entry.kind == EntryKind::Directory {
            fs::remove_dir(&target)?;
        } else {
            fs::remove_file(&target)?;
        }
        debug!("removed {}", target.display());
        Ok(())
    }

    fn rename(&mut self, path: &Path, _index: usize, entry: &DirEntry, new_name: &str) -> Result<()> {
        check_file_name(new_name)?;
        fs::rename(path.join(&entry.name), path.join(new_name))?;
        Ok(())
    }

    fn mkdir(&mut self, path: &Path, name: &str) -> Result<()> {
        check_file_name(name)?;
        fs::create_dir(path.join(name))?;
        debug!("created directory {}", path.join(name).display());
        Ok(())
    }

    fn describe(&self, count: usize) -> String {
        count_noun(count, "file", "files")
    }
}
