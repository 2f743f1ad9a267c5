//! Tunables for the storage engine and directory layer
//!
//! Loaded from TOML. Every field has a default, so an empty document is a
//! valid configuration:
//!
//! ```toml
//! lookahead = 30
//! max_history = 100
//! junk_threshold_kb = 500
//! show_hidden = false
//! copy_buffer_size = 65536
//! ```

use crate::error::{Result, WadError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default forward window searched when re-parsing a directory table
pub const DEFAULT_LOOKAHEAD: usize = 30;

/// Default junk size (in KB) above which callers should offer compaction
pub const DEFAULT_JUNK_THRESHOLD_KB: u64 = 500;

/// Default buffer size for lump copies during compaction
pub const DEFAULT_COPY_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WadConfig {
    /// How many old entries to scan ahead for a reusable cached lump prefix
    pub lookahead: usize,

    /// Maximum number of revisions kept for undo (None = unbounded)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_history: Option<usize>,

    /// Junk threshold used by `WadFile::should_compact`
    pub junk_threshold_kb: u64,

    /// List dot-files in filesystem directories
    pub show_hidden: bool,

    /// Chunk size for copying lump data
    pub copy_buffer_size: usize,
}

impl Default for WadConfig {
    fn default() -> Self {
        Self {
            lookahead: DEFAULT_LOOKAHEAD,
            max_history: None,
            junk_threshold_kb: DEFAULT_JUNK_THRESHOLD_KB,
            show_hidden: false,
            copy_buffer_size: DEFAULT_COPY_BUFFER_SIZE,
        }
    }
}

impl WadConfig {
    /// Parse a configuration from a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: WadConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.copy_buffer_size == 0 {
            return Err(WadError::Config(
                "copy_buffer_size must be non-zero".to_string(),
            ));
        }
        if self.max_history == Some(0) {
            return Err(WadError::Config(
                "max_history must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = WadConfig::from_toml_str("").unwrap();
        assert_eq!(config, WadConfig::default());
    }

    #[test]
    fn test_partial_document() {
        let config = WadConfig::from_toml_str("lookahead = 4\nmax_history = 10\n").unwrap();
        assert_eq!(config.lookahead, 4);
        assert_eq!(config.max_history, Some(10));
        assert_eq!(config.junk_threshold_kb, DEFAULT_JUNK_THRESHOLD_KB);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            WadConfig::from_toml_str("copy_buffer_size = 0"),
            Err(WadError::Config(_))
        ));
        assert!(matches!(
            WadConfig::from_toml_str("lookahead = \"many\""),
            Err(WadError::Config(_))
        ));
    }
}
