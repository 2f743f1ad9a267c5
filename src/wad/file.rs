use super::format::{
    decode_name, encode_name, name_matches, TableRecord, WadHeader, WadKind, ENTRY_SIZE,
    HEADER_SIZE, LUMP_HEADER_LEN, NAME_LEN, PLACEHOLDER_NAME,
};
use super::history::{History, Snapshot, DEFAULT_COMMIT_MESSAGE};
use super::serial::next_serial;
use crate::config::WadConfig;
use crate::error::{Result, WadError};
use crate::stream::{SharedStream, Stream};
use std::cell::{Cell, RefCell};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};
use tracing::{debug, info, warn};

/// One directory entry as held in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WadEntry {
    name: [u8; NAME_LEN],
    position: u32,
    size: u32,
    header: [u8; LUMP_HEADER_LEN],
    serial: u64,
}

impl WadEntry {
    fn blank() -> Self {
        Self {
            name: encode_name(PLACEHOLDER_NAME),
            position: 0,
            size: 0,
            header: [0u8; LUMP_HEADER_LEN],
            serial: next_serial(),
        }
    }

    pub fn name(&self) -> String {
        decode_name(&self.name)
    }

    /// The name exactly as stored in the table
    pub fn raw_name(&self) -> &[u8; NAME_LEN] {
        &self.name
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Session-unique identity of this entry
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Cached leading bytes of the lump (at most 16, never more than its size)
    pub fn header_prefix(&self) -> &[u8] {
        let len = (self.size as usize).min(LUMP_HEADER_LEN);
        &self.header[..len]
    }

    pub(super) fn set_position(&mut self, position: u32) {
        self.position = position;
    }

    fn record(&self) -> TableRecord {
        TableRecord {
            position: self.position,
            size: self.size,
            name: self.name,
        }
    }

    /// Same logical entry in the same place (ignores the cached prefix)
    fn same_slot(&self, other: &WadEntry) -> bool {
        self.serial == other.serial
            && self.name == other.name
            && self.position == other.position
            && self.size == other.size
    }
}

pub(super) struct WadState {
    pub(super) vfs: SharedStream,
    pub(super) read_only: bool,
    pub(super) header: WadHeader,
    pub(super) directory: Vec<WadEntry>,
    /// Where the next lump data or table gets written
    pub(super) write_pos: u64,
    /// Directory differs from the table on disk
    pub(super) dirty: bool,
    pub(super) write_lump: Option<usize>,
    pub(super) closed: bool,
    lookahead: usize,
}

impl WadState {
    pub(super) fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(WadError::Closed);
        }
        Ok(())
    }

    /// Preconditions shared by every table mutation
    pub(super) fn check_mutable(&self) -> Result<()> {
        self.check_open()?;
        if self.read_only {
            return Err(WadError::ReadOnly);
        }
        if self.write_lump.is_some() {
            return Err(WadError::WriteLumpOpen);
        }
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.directory.len() {
            return Err(WadError::out_of_range(index, self.directory.len()));
        }
        Ok(())
    }

    /// Read up to `buf.len()` bytes at `offset`; short at end of file
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let mut vfs = self.vfs.borrow_mut();
        vfs.seek(SeekFrom::Start(offset))?;
        let mut filled = 0;
        while filled < buf.len() {
            match vfs.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    fn read_prefix(&self, position: u32, size: u32) -> Result<[u8; LUMP_HEADER_LEN]> {
        let mut buf = [0u8; LUMP_HEADER_LEN];
        let want = (size as usize).min(LUMP_HEADER_LEN);
        if want > 0 {
            self.read_at(position as u64, &mut buf[..want])?;
        }
        Ok(buf)
    }

    /// Find an old entry for the same byte range within the look-ahead
    /// window. Only lumps lying wholly below the write cursor qualify: bytes
    /// past it may have been rewritten since the old prefix was cached.
    fn lookahead_match(&self, from: usize, record: &TableRecord) -> Option<usize> {
        let lump_end = record.position as u64 + record.size as u64;
        if lump_end > self.write_pos {
            return None;
        }
        let end = from.saturating_add(self.lookahead).min(self.directory.len());
        (from..end).find(|&k| {
            let old = &self.directory[k];
            old.position == record.position && old.size == record.size
        })
    }

    /// Parse the table the header points at, replacing the directory.
    /// Every entry gets a fresh serial number.
    pub(super) fn read_directory(&mut self) -> Result<()> {
        let offset = self.header.table_offset as u64;
        let table_len = self.header.table_len();
        let file_len = self.vfs.borrow_mut().len()?;
        if offset + table_len > file_len {
            return Err(WadError::Truncated(format!(
                "directory table at {} ({} entries) runs past end of file ({} bytes)",
                offset, self.header.num_lumps, file_len
            )));
        }

        let mut table = vec![0u8; table_len as usize];
        if self.read_at(offset, &mut table)? != table.len() {
            return Err(WadError::Truncated("directory table".to_string()));
        }

        let mut directory = Vec::with_capacity(self.header.num_lumps as usize);
        let mut reused = 0usize;
        let mut j = 0;
        for chunk in table.chunks_exact(ENTRY_SIZE as usize) {
            let mut raw = [0u8; ENTRY_SIZE as usize];
            raw.copy_from_slice(chunk);
            let record = TableRecord::from_bytes(&raw);

            let header = match self.lookahead_match(j, &record) {
                Some(k) => {
                    j = k + 1;
                    reused += 1;
                    self.directory[k].header
                }
                None => self.read_prefix(record.position, record.size)?,
            };

            directory.push(WadEntry {
                name: record.name,
                position: record.position,
                size: record.size,
                header,
                serial: next_serial(),
            });
        }

        debug!(
            "read directory at {}: {} entries ({} cached prefixes reused)",
            offset,
            directory.len(),
            reused
        );
        self.directory = directory;
        Ok(())
    }

    pub(super) fn write_header(&mut self) -> Result<()> {
        let bytes = self.header.to_bytes();
        let mut vfs = self.vfs.borrow_mut();
        vfs.seek(SeekFrom::Start(0))?;
        vfs.write_all(&bytes)?;
        vfs.flush()?;
        Ok(())
    }

    /// Append the whole directory at the write cursor and repoint the header
    pub(super) fn write_directory(&mut self) -> Result<()> {
        let table_offset =
            u32::try_from(self.write_pos).map_err(|_| WadError::TooLarge(self.write_pos))?;

        let mut table = Vec::with_capacity(self.directory.len() * ENTRY_SIZE as usize);
        for entry in &self.directory {
            table.extend_from_slice(&entry.record().to_bytes());
        }

        {
            let mut vfs = self.vfs.borrow_mut();
            vfs.seek(SeekFrom::Start(self.write_pos))?;
            vfs.write_all(&table)?;
            vfs.sync()?;
        }

        self.header.table_offset = table_offset;
        self.header.num_lumps = self.directory.len() as u32;
        // A later rollback to an older header can truncate here
        self.write_pos += table.len() as u64;

        self.write_header()?;
        self.dirty = false;

        debug!(
            "wrote directory: {} entries at {}, write cursor now {}",
            self.directory.len(),
            table_offset,
            self.write_pos
        );
        Ok(())
    }

    /// Called when the rewrite view closes after `written` bytes
    fn finish_write(&mut self, written: u64) -> Result<()> {
        let Some(index) = self.write_lump.take() else {
            return Ok(());
        };
        let size = u32::try_from(written).map_err(|_| WadError::TooLarge(written))?;

        let position = {
            let entry = &mut self.directory[index];
            entry.size = size;
            entry.position
        };
        self.write_pos = position as u64 + written;
        self.dirty = true;

        let header = self.read_prefix(position, size)?;
        self.directory[index].header = header;

        debug!("lump {} rewritten: {} bytes at {}", index, size, position);
        Ok(())
    }

    pub(super) fn capture(&self) -> Snapshot {
        Snapshot {
            header: self.header,
            write_pos: self.write_pos,
            serials: self.directory.iter().map(|e| e.serial).collect(),
        }
    }

    /// Reinstate a snapshot. Returns the first index whose entry differs
    /// from what was loaded before.
    pub(super) fn restore(&mut self, snapshot: &Snapshot) -> Result<Option<usize>> {
        self.check_mutable()?;

        let before = self.directory.clone();
        self.header = snapshot.header;
        self.write_pos = snapshot.write_pos;
        self.read_directory()?;

        if snapshot.serials.len() != self.directory.len() {
            return Err(WadError::Truncated(format!(
                "snapshot lists {} entries, table has {}",
                snapshot.serials.len(),
                self.directory.len()
            )));
        }
        for (entry, &serial) in self.directory.iter_mut().zip(&snapshot.serials) {
            entry.serial = serial;
        }

        self.write_header()?;
        self.dirty = false;

        Ok(first_change(&before, &self.directory))
    }

    pub(super) fn minimum_size(&self) -> u64 {
        HEADER_SIZE
            + ENTRY_SIZE * self.directory.len() as u64
            + self.directory.iter().map(|e| e.size as u64).sum::<u64>()
    }
}

fn first_change(before: &[WadEntry], after: &[WadEntry]) -> Option<usize> {
    let common = before.len().min(after.len());
    if let Some(i) = (0..common).find(|&i| !before[i].same_slot(&after[i])) {
        return Some(i);
    }
    if before.len() == after.len() || after.is_empty() {
        None
    } else {
        Some(common.min(after.len() - 1))
    }
}

/// An open WAD archive.
///
/// Lump data is accessed through restricted [`Stream`] views. Any number of
/// read views may be open at once, but only one rewrite view, and the table
/// cannot be mutated while it is open. New data and new tables are always
/// appended at the write cursor; [`WadFile::commit`] makes the header point
/// at the latest table, which is what makes undo cheap.
pub struct WadFile {
    pub(super) state: Rc<RefCell<WadState>>,
    /// Views (read and write) not yet closed
    pub(super) open_lumps: Rc<Cell<usize>>,
    pub(super) history: History,
    pub(super) config: WadConfig,
    path: Option<PathBuf>,
}

impl WadFile {
    /// Create a new, empty PWAD on disk (overwriting any existing file)
    pub fn create<P: AsRef<Path>>(path: P) -> Result<()> {
        let mut file = std::fs::File::create(path.as_ref())?;
        WadHeader::empty(WadKind::Pwad).write_to(&mut file)?;
        file.sync_all()?;
        info!("created empty WAD {}", path.as_ref().display());
        Ok(())
    }

    /// Open a WAD, read-write when the file permits it
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, WadConfig::default())
    }

    pub fn open_with<P: AsRef<Path>>(path: P, config: WadConfig) -> Result<Self> {
        let path = path.as_ref();
        let (stream, read_only) = match Stream::open_file(path, true) {
            Ok(stream) => (stream, false),
            Err(e) => {
                debug!("{} not writable ({}), opening read-only", path.display(), e);
                (Stream::open_file(path, false)?, true)
            }
        };

        let mut wad = Self::load(stream, read_only, config)?;
        wad.path = Some(path.to_path_buf());
        info!(
            "opened {} ({:?}, {} lumps{})",
            path.display(),
            wad.kind(),
            wad.num_lumps(),
            if read_only { ", read-only" } else { "" }
        );
        Ok(wad)
    }

    /// Open an archive held in any stream
    pub fn from_stream(stream: Stream, read_only: bool) -> Result<Self> {
        Self::from_stream_with(stream, read_only, WadConfig::default())
    }

    pub fn from_stream_with(stream: Stream, read_only: bool, config: WadConfig) -> Result<Self> {
        Self::load(stream, read_only, config)
    }

    fn load(mut stream: Stream, read_only: bool, config: WadConfig) -> Result<Self> {
        stream.seek(SeekFrom::Start(0))?;
        let header = WadHeader::read_from(&mut stream)?;
        let write_pos = stream.seek(SeekFrom::End(0))?;

        let mut state = WadState {
            vfs: stream.shared(),
            read_only,
            header,
            directory: Vec::new(),
            write_pos,
            dirty: false,
            write_lump: None,
            closed: false,
            lookahead: config.lookahead,
        };
        state.read_directory()?;

        let history = History::new(state.capture(), config.max_history);
        Ok(Self {
            state: Rc::new(RefCell::new(state)),
            open_lumps: Rc::new(Cell::new(0)),
            history,
            config,
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn config(&self) -> &WadConfig {
        &self.config
    }

    pub fn kind(&self) -> WadKind {
        self.state.borrow().header.kind
    }

    pub fn is_iwad(&self) -> bool {
        self.kind() == WadKind::Iwad
    }

    pub fn is_read_only(&self) -> bool {
        self.state.borrow().read_only
    }

    pub fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }

    pub fn num_lumps(&self) -> usize {
        self.state.borrow().directory.len()
    }

    /// Copy of the in-memory directory
    pub fn entries(&self) -> Vec<WadEntry> {
        self.state.borrow().directory.clone()
    }

    pub fn entry(&self, index: usize) -> Option<WadEntry> {
        self.state.borrow().directory.get(index).cloned()
    }

    pub fn serial_numbers(&self) -> Vec<u64> {
        self.state.borrow().directory.iter().map(|e| e.serial).collect()
    }

    /// Index of the last lump with this name (case-insensitive)
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.state
            .borrow()
            .directory
            .iter()
            .rposition(|e| name_matches(&e.name, name))
    }

    pub fn find_by_serial(&self, serial: u64) -> Option<usize> {
        self.state
            .borrow()
            .directory
            .iter()
            .position(|e| e.serial == serial)
    }

    /// Cached leading bytes of a lump, for type sniffing without opening it
    pub fn read_lump_header(&self, index: usize) -> Result<Vec<u8>> {
        let state = self.state.borrow();
        state.check_index(index)?;
        Ok(state.directory[index].header_prefix().to_vec())
    }

    /// Uncommitted directory changes exist
    pub fn need_commit(&self) -> bool {
        let state = self.state.borrow();
        !state.read_only && state.dirty
    }

    pub fn write_pos(&self) -> u64 {
        self.state.borrow().write_pos
    }

    pub fn file_len(&self) -> Result<u64> {
        let state = self.state.borrow();
        state.check_open()?;
        let len = state.vfs.borrow_mut().len()?;
        Ok(len)
    }

    /// Lump views not yet closed
    pub fn open_lump_count(&self) -> usize {
        self.open_lumps.get()
    }

    pub fn has_write_lump(&self) -> bool {
        self.state.borrow().write_lump.is_some()
    }

    /// Read-only view spanning exactly one lump
    pub fn open_lump(&self, index: usize) -> Result<Stream> {
        let mut view = {
            let state = self.state.borrow();
            state.check_open()?;
            state.check_index(index)?;
            let entry = &state.directory[index];
            let start = entry.position as u64;
            Stream::restricted(&state.vfs, start, Some(start + entry.size as u64), true)?
        };

        self.open_lumps.set(self.open_lumps.get() + 1);
        let counter = Rc::clone(&self.open_lumps);
        view.on_close(move |_| counter.set(counter.get().saturating_sub(1)));
        Ok(view)
    }

    /// Writable view for replacing a lump's contents.
    ///
    /// The lump is moved to the write cursor immediately; its size is taken
    /// from the view's position when the view is closed.
    pub fn open_lump_for_rewrite(&mut self, index: usize) -> Result<Stream> {
        let mut view = {
            let mut state = self.state.borrow_mut();
            state.check_mutable()?;
            state.check_index(index)?;

            let write_pos = state.write_pos;
            let position = u32::try_from(write_pos).map_err(|_| WadError::TooLarge(write_pos))?;
            let view = Stream::restricted(&state.vfs, write_pos, None, false)?;

            state.directory[index].position = position;
            state.write_lump = Some(index);
            view
        };
        // Data goes where newer revisions may live
        self.history.discard_redo();

        self.open_lumps.set(self.open_lumps.get() + 1);
        let counter = Rc::clone(&self.open_lumps);
        let state: Weak<RefCell<WadState>> = Rc::downgrade(&self.state);
        view.on_close(move |stream| {
            counter.set(counter.get().saturating_sub(1));
            let written = match stream.tell() {
                Ok(n) => n,
                Err(e) => {
                    warn!("cannot read size of rewritten lump: {}", e);
                    0
                }
            };
            let Some(state) = state.upgrade() else {
                return;
            };
            let result = match state.try_borrow_mut() {
                Ok(mut state) => state.finish_write(written),
                Err(_) => {
                    warn!("archive busy while closing rewritten lump; size not recorded");
                    return;
                }
            };
            if let Err(e) = result {
                warn!("failed to finalize rewritten lump: {}", e);
            }
        });
        Ok(view)
    }

    /// Read a whole lump into memory
    pub fn read_lump(&self, index: usize) -> Result<Vec<u8>> {
        let mut view = self.open_lump(index)?;
        let data = view.read_all()?;
        view.close()?;
        Ok(data)
    }

    /// Replace a lump's contents
    pub fn write_lump(&mut self, index: usize, data: &[u8]) -> Result<()> {
        let mut view = self.open_lump_for_rewrite(index)?;
        view.write_all(data)?;
        view.close()?;
        Ok(())
    }

    /// Insert a named lump with the given contents before `before`
    pub fn add_lump(&mut self, before: usize, name: &str, data: &[u8]) -> Result<()> {
        self.insert_entries(before, 1)?;
        self.set_lump_name(before, name)?;
        self.write_lump(before, data)
    }

    /// Insert `count` blank entries before `before`
    pub fn insert_entries(&mut self, before: usize, count: usize) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.check_mutable()?;
        if before > state.directory.len() {
            return Err(WadError::out_of_range(before, state.directory.len()));
        }

        let blanks = (0..count).map(|_| WadEntry::blank());
        state.directory.splice(before..before, blanks);
        state.dirty = true;
        Ok(())
    }

    pub fn delete_entry(&mut self, index: usize) -> Result<()> {
        self.delete_entries(index, 1)
    }

    /// Remove the contiguous run `[index, index + count)`
    pub fn delete_entries(&mut self, index: usize, count: usize) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.check_mutable()?;
        let len = state.directory.len();
        let end = index.checked_add(count).filter(|&end| end <= len);
        let Some(end) = end else {
            return Err(WadError::out_of_range(index.saturating_add(count), len));
        };

        state.directory.drain(index..end);
        state.dirty = true;
        Ok(())
    }

    /// Exchange two entries. All reordering is built from this.
    pub fn swap_entries(&mut self, a: usize, b: usize) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.check_mutable()?;
        if a == b {
            return Ok(());
        }
        state.check_index(a)?;
        state.check_index(b)?;

        state.directory.swap(a, b);
        state.dirty = true;
        Ok(())
    }

    /// Rename a lump (upper-cased, at most 8 characters)
    pub fn set_lump_name(&mut self, index: usize, name: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.check_open()?;
        if state.read_only {
            return Err(WadError::ReadOnly);
        }
        state.check_index(index)?;

        state.directory[index].name = encode_name(name);
        state.dirty = true;
        Ok(())
    }

    /// Commit directory changes as an undoable revision with a generic
    /// message. Returns whether anything was written.
    pub fn commit(&mut self) -> Result<bool> {
        self.commit_changes(DEFAULT_COMMIT_MESSAGE)
    }

    /// Write the directory table if it changed, leaving history alone.
    /// Returns whether anything was written.
    pub(super) fn write_table(&mut self) -> Result<bool> {
        {
            let state = self.state.borrow();
            state.check_open()?;
            if state.write_lump.is_some() {
                return Err(WadError::WriteLumpOpen);
            }
            if state.read_only || !state.dirty {
                return Ok(false);
            }
        }
        self.history.discard_redo();
        self.state.borrow_mut().write_directory()?;
        Ok(true)
    }

    /// Header + table + lump data, with no gaps
    pub fn minimum_size(&self) -> u64 {
        self.state.borrow().minimum_size()
    }

    /// Bytes below the write cursor not reachable from the directory.
    ///
    /// Data past the cursor is ignored: it is truncated on close anyway.
    pub fn junk_bytes(&self) -> u64 {
        let state = self.state.borrow();
        state.write_pos.saturating_sub(state.minimum_size())
    }

    /// Junk exceeds the configured threshold
    pub fn should_compact(&self) -> bool {
        !self.is_read_only() && self.junk_bytes() / 1000 >= self.config.junk_threshold_kb
    }

    /// Capture header, write cursor and serial numbers.
    ///
    /// Pending directory changes are committed first so the snapshot always
    /// names a table that exists on disk.
    pub fn save_snapshot(&mut self) -> Result<Snapshot> {
        self.commit()?;
        Ok(self.state.borrow().capture())
    }

    /// Return to a snapshot, re-binding its serial numbers. Returns the first
    /// index that changed.
    pub fn restore_snapshot(&mut self, snapshot: &Snapshot) -> Result<Option<usize>> {
        self.state.borrow_mut().restore(snapshot)
    }

    /// Close the archive, truncating at the write cursor, and release the
    /// underlying file handle.
    ///
    /// Anything past the cursor (redo history, abandoned writes) is lost.
    /// Every lump view must be closed first.
    pub fn close(&mut self) -> Result<()> {
        let open = self.open_lumps.get();
        if open > 0 {
            return Err(WadError::LumpsStillOpen(open));
        }

        let mut state = self.state.borrow_mut();
        if state.closed {
            return Ok(());
        }
        {
            let mut vfs = state.vfs.borrow_mut();
            if !state.read_only {
                vfs.seek(SeekFrom::Start(state.write_pos))?;
                vfs.truncate()?;
            }
            vfs.close()?;
        }
        state.closed = true;

        debug!("closed WAD at {} bytes", state.write_pos);
        Ok(())
    }
}

impl Drop for WadFile {
    fn drop(&mut self) {
        if self.is_closed() {
            return;
        }
        let open = self.open_lumps.get();
        if open > 0 {
            warn!("dropping WAD with {} lump(s) open; not truncating", open);
            return;
        }
        if let Err(e) = self.close() {
            warn!("error closing WAD: {}", e);
        }
    }
}

impl std::fmt::Debug for WadFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("WadFile")
            .field("path", &self.path)
            .field("kind", &state.header.kind)
            .field("lumps", &state.directory.len())
            .field("write_pos", &state.write_pos)
            .field("read_only", &state.read_only)
            .field("dirty", &state.dirty)
            .finish()
    }
}
