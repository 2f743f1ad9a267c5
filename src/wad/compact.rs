//! Reclaiming junk space
//!
//! Lumps are packed in two passes. The first copies every lump past the end
//! of the packed layout so nothing live sits in the region being packed; the
//! second copies them back down, directly after the header.

use super::file::WadFile;
use super::format::HEADER_SIZE;
use crate::error::{Result, WadError};
use crate::stream::{self, Stream};
use std::io::{Seek, SeekFrom};
use tracing::{debug, info};

/// Progress callbacks for [`WadFile::compact`]
pub trait CompactProgress {
    /// Called once before copying, with the total number of lump copies
    fn on_start(&mut self, total: usize) {
        let _ = total;
    }

    /// Called after each lump copy
    fn on_lump(&mut self, done: usize, total: usize);
}

impl<F> CompactProgress for F
where
    F: FnMut(usize, usize),
{
    fn on_lump(&mut self, done: usize, total: usize) {
        self(done, total)
    }
}

/// Progress sink that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl CompactProgress for NoProgress {
    fn on_lump(&mut self, _done: usize, _total: usize) {}
}

impl WadFile {
    /// Remove junk by repacking every lump.
    ///
    /// Returns false when the file is already minimal. Undo history is
    /// cleared on success, since older tables no longer exist.
    pub fn compact(&mut self, progress: &mut dyn CompactProgress) -> Result<bool> {
        self.state.borrow().check_mutable()?;
        self.write_table()?;

        let min_size = self.minimum_size();
        let file_len = self.file_len()?;
        if file_len <= min_size {
            debug!("compaction skipped: {} bytes is already minimal", file_len);
            return Ok(false);
        }

        let count = self.num_lumps();
        let total = count * 2;
        progress.on_start(total);

        // Start past the packed layout so pass two never overwrites a lump
        // it has yet to copy
        let staging = self.write_pos().max(min_size);
        self.rewrite_all_lumps(staging, progress, 0, total)?;
        self.rewrite_all_lumps(HEADER_SIZE, progress, count, total)?;

        let new_len = {
            let state = self.state.borrow();
            let mut vfs = state.vfs.borrow_mut();
            vfs.seek(SeekFrom::Start(state.write_pos))?;
            vfs.truncate()?;
            vfs.sync()?;
            state.write_pos
        };

        self.clear_history();
        info!(
            "compacted {} lumps: {} -> {} bytes",
            count, file_len, new_len
        );
        Ok(true)
    }

    /// Copy every lump, in directory order, to consecutive offsets from
    /// `start`, then write the table after them
    fn rewrite_all_lumps(
        &mut self,
        start: u64,
        progress: &mut dyn CompactProgress,
        done: usize,
        total: usize,
    ) -> Result<()> {
        let buf_size = self.config.copy_buffer_size;
        let count = self.num_lumps();
        let mut dest = start;

        for i in 0..count {
            {
                let mut state = self.state.borrow_mut();
                let (position, size) = {
                    let entry = &state.directory[i];
                    (entry.position() as u64, entry.size() as u64)
                };
                let new_position = u32::try_from(dest).map_err(|_| WadError::TooLarge(dest))?;

                let mut src = Stream::restricted(&state.vfs, position, Some(position + size), true)?;
                let mut dst = Stream::restricted(&state.vfs, dest, None, false)?;
                let copied = stream::copy_with_buffer(&mut src, &mut dst, buf_size)?;
                dst.close()?;
                if copied != size {
                    return Err(WadError::Truncated(format!(
                        "lump {} copied {} of {} bytes",
                        i, copied, size
                    )));
                }

                state.directory[i].set_position(new_position);
                dest += size;
            }
            progress.on_lump(done + i + 1, total);
        }

        let mut state = self.state.borrow_mut();
        state.write_pos = dest;
        state.write_directory()
    }
}
