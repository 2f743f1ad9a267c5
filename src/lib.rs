//! wadstore-rs: WAD archive storage engine and directory VFS
//!
//! This library manages Doom-engine WAD files, combining:
//! - Restricted stream views over files and memory buffers
//! - An append-only WAD storage engine with single-writer lump access
//! - Snapshot-based undo/redo and two-pass compaction
//! - A directory abstraction over WADs and host directories, with
//!   serial-number identity, selection sets, and glob selection
//!
//! # Example
//!
//! ```no_run
//! use wadstore_rs::WadFile;
//!
//! WadFile::create("example.wad")?;
//!
//! let mut wad = WadFile::open("example.wad")?;
//! wad.add_lump(0, "DEHACKED", b"Patch File for DeHackEd v3.0")?;
//! wad.commit_changes("creation of 'DEHACKED' lump")?;
//!
//! let index = wad.find_by_name("dehacked").unwrap();
//! let data = wad.read_lump(index)?;
//! # Ok::<(), wadstore_rs::error::WadError>(())
//! ```

// Core modules
pub mod config;
pub mod error;
pub mod stream;
pub mod vfs;
pub mod wad;

// Re-export commonly used types
pub use config::WadConfig;
pub use error::{Result, WadError};
pub use stream::{SharedStream, Stream};
pub use vfs::{DirEntry, Directory, DirectoryBackend, DirectoryRef, EntryKind, FileSet, Target, Vfs};
pub use wad::{
    ArchiveSummary, CompactProgress, NoProgress, Snapshot, WadEntry, WadFile, WadKind, HEADER_SIZE,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Ensure core types are accessible
        let _config = WadConfig::default();
        let _set = FileSet::new();
        assert_eq!(WadKind::Pwad.magic(), *b"PWAD");
    }
}
