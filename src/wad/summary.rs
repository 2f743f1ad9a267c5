use super::file::WadFile;
use super::format::WadKind;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Serializable overview of an open archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveSummary {
    pub kind: WadKind,
    pub read_only: bool,
    pub table_offset: u32,
    pub file_len: u64,
    pub junk_bytes: u64,
    pub lumps: Vec<LumpSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LumpSummary {
    pub name: String,
    pub position: u32,
    pub size: u32,
}

impl WadFile {
    pub fn summary(&self) -> Result<ArchiveSummary> {
        let lumps = self
            .entries()
            .iter()
            .map(|e| LumpSummary {
                name: e.name(),
                position: e.position(),
                size: e.size(),
            })
            .collect();

        Ok(ArchiveSummary {
            kind: self.kind(),
            read_only: self.is_read_only(),
            table_offset: self.state.borrow().header.table_offset,
            file_len: self.file_len()?,
            junk_bytes: self.junk_bytes(),
            lumps,
        })
    }

    /// [`WadFile::summary`] as pretty-printed JSON
    pub fn summary_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.summary()?)?)
    }
}
