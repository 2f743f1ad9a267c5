//! WAD storage engine
//!
//! A WAD is a 12-byte header, lump data, and a table of 16-byte records
//! (position, size, name). The table can live anywhere; the header says
//! where. [`WadFile`] never rewrites data in place: new lump contents and
//! new tables are appended at a write cursor, and the space they replace is
//! junk until [`WadFile::compact`] reclaims it.

mod compact;
mod file;
mod format;
mod history;
mod serial;
mod summary;

pub use compact::{CompactProgress, NoProgress};
pub use file::{WadEntry, WadFile};
pub use format::{
    decode_name, encode_name, has_wad_extension, name_matches, TableRecord, WadHeader, WadKind,
    ENTRY_SIZE, HEADER_SIZE, LUMP_HEADER_LEN, NAME_LEN, PLACEHOLDER_NAME,
};
pub use history::{Snapshot, DEFAULT_COMMIT_MESSAGE, INITIAL_MESSAGE};
pub use serial::next_serial;
pub use summary::{ArchiveSummary, LumpSummary};
