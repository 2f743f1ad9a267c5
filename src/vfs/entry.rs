use serde::{Deserialize, Serialize};

/// What a directory entry refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A directory on disk
    Directory,
    /// A file on disk with a `.wad` extension
    Wad,
    /// Any other file on disk
    File,
    /// A lump inside a WAD
    Lump,
}

impl EntryKind {
    /// Can be opened as a [`super::Directory`]
    pub fn is_container(self) -> bool {
        matches!(self, EntryKind::Directory | EntryKind::Wad)
    }
}

/// One entry of a [`super::Directory`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
    /// Size in bytes, when known
    pub size: Option<u64>,
    /// Identity of the entry for this session
    pub serial: u64,
}
