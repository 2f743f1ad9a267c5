use std::io;
use thiserror::Error;

/// Result type for wadstore operations
pub type Result<T> = std::result::Result<T, WadError>;

/// Unified error type for all wadstore operations
#[derive(Debug, Error)]
pub enum WadError {
    // Format errors
    #[error("Invalid magic in WAD header: {0:?}")]
    InvalidMagic([u8; 4]),

    #[error("Truncated WAD: {0}")]
    Truncated(String),

    #[error("WAD too large: offset {0} does not fit in 32 bits")]
    TooLarge(u64),

    // Precondition violations (caller bugs)
    #[error("WAD is read-only")]
    ReadOnly,

    #[error("A lump is already open for writing")]
    WriteLumpOpen,

    #[error("{0} lump(s) still open")]
    LumpsStillOpen(usize),

    #[error("Index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("WAD file has been closed")]
    Closed,

    #[error("Nothing to {0}")]
    NoHistory(String),

    #[error("Uncommitted changes; commit or roll back first")]
    UncommittedChanges,

    // Directory errors
    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Operation not supported: {0}")]
    Unsupported(String),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for WadError {
    fn from(err: toml::de::Error) -> Self {
        WadError::Config(err.to_string())
    }
}

impl WadError {
    /// Build an out-of-range error
    pub(crate) fn out_of_range(index: usize, len: usize) -> Self {
        WadError::IndexOutOfRange { index, len }
    }
}
