use super::SharedStream;
use std::io::{self, Read, Seek, SeekFrom, Write};

/// A bounded window onto another stream.
///
/// The view owns only its cursor. Every access re-seeks the shared inner
/// stream to `start + pos`, so several views over one inner stream can be
/// used in any interleaving.
pub struct RestrictedView {
    inner: SharedStream,
    start: u64,
    end: Option<u64>,
    read_only: bool,
    pos: u64,
}

impl RestrictedView {
    pub(super) fn new(
        inner: SharedStream,
        start: u64,
        end: Option<u64>,
        read_only: bool,
    ) -> io::Result<Self> {
        if let Some(end) = end {
            if end < start {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("restricted view end {} before start {}", end, start),
                ));
            }
        }
        Ok(Self {
            inner,
            start,
            end,
            read_only,
            pos: 0,
        })
    }

    /// Offset of the window within the inner stream
    pub fn start(&self) -> u64 {
        self.start
    }

    /// End of the window within the inner stream, if bounded
    pub fn end(&self) -> Option<u64> {
        self.end
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Local cursor (always `global_offset - start`)
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Window length, if bounded
    pub fn window_len(&self) -> Option<u64> {
        self.end.map(|end| end - self.start)
    }

    /// Bytes that may still be transferred from the current position
    fn remaining(&self, want: usize) -> usize {
        match self.window_len() {
            Some(len) => {
                let left = len.saturating_sub(self.pos);
                want.min(usize::try_from(left).unwrap_or(usize::MAX))
            }
            None => want,
        }
    }

    fn borrow_inner(&self) -> io::Result<std::cell::RefMut<'_, super::Stream>> {
        self.inner.try_borrow_mut().map_err(|_| {
            io::Error::new(io::ErrorKind::WouldBlock, "inner stream is busy")
        })
    }

    pub(super) fn truncate(&mut self) -> io::Result<()> {
        if self.read_only {
            return Err(read_only_error());
        }
        let mut inner = self.borrow_inner()?;
        inner.seek(SeekFrom::Start(self.start + self.pos))?;
        inner.truncate()
    }

    pub(super) fn sync(&mut self) -> io::Result<()> {
        self.borrow_inner()?.sync()
    }

    pub(super) fn len(&mut self) -> io::Result<u64> {
        match self.window_len() {
            Some(len) => Ok(len),
            None => {
                let inner_len = self.borrow_inner()?.len()?;
                Ok(inner_len.saturating_sub(self.start))
            }
        }
    }
}

fn read_only_error() -> io::Error {
    io::Error::new(io::ErrorKind::PermissionDenied, "restricted view is read-only")
}

impl Read for RestrictedView {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let want = self.remaining(buf.len());
        if want == 0 {
            return Ok(0);
        }

        let n = {
            let mut inner = self.borrow_inner()?;
            inner.seek(SeekFrom::Start(self.start + self.pos))?;
            inner.read(&mut buf[..want])?
        };
        self.pos += n as u64;
        Ok(n)
    }
}

impl Write for RestrictedView {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.read_only {
            return Err(read_only_error());
        }
        let want = self.remaining(buf.len());
        if want == 0 {
            return Ok(0);
        }

        let n = {
            let mut inner = self.borrow_inner()?;
            inner.seek(SeekFrom::Start(self.start + self.pos))?;
            inner.write(&buf[..want])?
        };
        self.pos += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.borrow_inner()?.flush()
    }
}

impl Seek for RestrictedView {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
            SeekFrom::End(delta) => self.len()?.checked_add_signed(delta),
        };

        let target = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek to a negative offset")
        })?;

        if let Some(len) = self.window_len() {
            if target > len {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("seek to {} beyond restricted window of {} bytes", target, len),
                ));
            }
        }

        self.pos = target;
        Ok(target)
    }
}
