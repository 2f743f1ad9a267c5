use crate::error::{Result, WadError};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Header size in bytes
pub const HEADER_SIZE: u64 = 12;

/// Directory table record size in bytes
pub const ENTRY_SIZE: u64 = 16;

/// Lump names are fixed-width
pub const NAME_LEN: usize = 8;

/// Number of leading lump bytes cached with each directory entry
pub const LUMP_HEADER_LEN: usize = 16;

/// Name given to freshly inserted entries
pub const PLACEHOLDER_NAME: &str = "UNNAMED";

pub const IWAD_MAGIC: [u8; 4] = *b"IWAD";
pub const PWAD_MAGIC: [u8; 4] = *b"PWAD";

/// The two archive variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WadKind {
    /// Complete game data
    Iwad,
    /// Patch / add-on
    Pwad,
}

impl WadKind {
    pub fn from_magic(magic: [u8; 4]) -> Result<Self> {
        match &magic {
            b"IWAD" => Ok(Self::Iwad),
            b"PWAD" => Ok(Self::Pwad),
            _ => Err(WadError::InvalidMagic(magic)),
        }
    }

    pub fn magic(self) -> [u8; 4] {
        match self {
            Self::Iwad => IWAD_MAGIC,
            Self::Pwad => PWAD_MAGIC,
        }
    }
}

/// The 12-byte header at offset 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WadHeader {
    pub kind: WadKind,
    pub num_lumps: u32,
    pub table_offset: u32,
}

impl WadHeader {
    /// Header of a new, empty archive
    pub fn empty(kind: WadKind) -> Self {
        Self {
            kind,
            num_lumps: 0,
            table_offset: HEADER_SIZE as u32,
        }
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.to_bytes())?;
        Ok(())
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE as usize] {
        let mut buf = [0u8; HEADER_SIZE as usize];
        buf[0..4].copy_from_slice(&self.kind.magic());
        buf[4..8].copy_from_slice(&self.num_lumps.to_le_bytes());
        buf[8..12].copy_from_slice(&self.table_offset.to_le_bytes());
        buf
    }

    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut buf = [0u8; HEADER_SIZE as usize];
        reader.read_exact(&mut buf).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => WadError::Truncated("header".to_string()),
            _ => WadError::Io(e),
        })?;

        let kind = WadKind::from_magic([buf[0], buf[1], buf[2], buf[3]])?;
        Ok(Self {
            kind,
            num_lumps: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            table_offset: u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
        })
    }

    /// Byte length of the table this header points at
    pub fn table_len(&self) -> u64 {
        self.num_lumps as u64 * ENTRY_SIZE
    }
}

/// One 16-byte directory table record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableRecord {
    pub position: u32,
    pub size: u32,
    pub name: [u8; NAME_LEN],
}

impl TableRecord {
    pub fn to_bytes(&self) -> [u8; ENTRY_SIZE as usize] {
        let mut buf = [0u8; ENTRY_SIZE as usize];
        buf[0..4].copy_from_slice(&self.position.to_le_bytes());
        buf[4..8].copy_from_slice(&self.size.to_le_bytes());
        buf[8..16].copy_from_slice(&self.name);
        buf
    }

    pub fn from_bytes(buf: &[u8; ENTRY_SIZE as usize]) -> Self {
        let mut name = [0u8; NAME_LEN];
        name.copy_from_slice(&buf[8..16]);
        Self {
            position: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            size: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            name,
        }
    }
}

/// Encode a name as a fixed-width, upper-cased, NUL-padded lump name.
/// Input stops at 8 characters or the first NUL.
pub fn encode_name(name: &str) -> [u8; NAME_LEN] {
    let mut out = [0u8; NAME_LEN];
    for (dst, src) in out.iter_mut().zip(name.bytes().take_while(|&b| b != 0)) {
        *dst = src.to_ascii_uppercase();
    }
    out
}

/// Decode a fixed-width lump name. The name ends at the first NUL; trailing
/// space padding is dropped.
pub fn decode_name(raw: &[u8; NAME_LEN]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
    String::from_utf8_lossy(&raw[..end]).trim_end_matches(' ').to_string()
}

/// Case-insensitive comparison of a raw name against a string
pub fn name_matches(raw: &[u8; NAME_LEN], name: &str) -> bool {
    decode_name(raw).eq_ignore_ascii_case(&decode_name(&encode_name(name)))
}

/// True for file names with a `.wad` extension
pub fn has_wad_extension(name: &str) -> bool {
    name.len() >= 4
        && name
            .get(name.len() - 4..)
            .is_some_and(|ext| ext.eq_ignore_ascii_case(".wad"))
}
