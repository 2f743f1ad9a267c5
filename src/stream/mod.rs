//! Virtual byte streams
//!
//! A [`Stream`] is one handle type over three media: an OS file, a growable
//! in-memory buffer, or a [`RestrictedView`] onto a window of another
//! (shared) stream. The storage engine hands out restricted views for lump
//! access and uses the one-shot close hook to learn how much was written.

mod restricted;

pub use restricted::RestrictedView;

use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::rc::Rc;
use tracing::warn;

/// A stream shared between its owner and any views restricted onto it
pub type SharedStream = Rc<RefCell<Stream>>;

/// Callback fired exactly once when a stream is closed
pub type CloseHook = Box<dyn FnOnce(&mut Stream)>;

enum Medium {
    File(File),
    Memory(Cursor<Vec<u8>>),
    Restricted(RestrictedView),
    /// Left behind by `close`; the file handle or buffer is gone
    Closed,
}

pub struct Stream {
    medium: Medium,
    on_close: Option<CloseHook>,
}

impl Stream {
    fn from_medium(medium: Medium) -> Self {
        Self {
            medium,
            on_close: None,
        }
    }

    /// Wrap an already-open file
    pub fn wrap_file(file: File) -> Self {
        Self::from_medium(Medium::File(file))
    }

    /// Open a file on disk, read-write if `writable`
    pub fn open_file<P: AsRef<Path>>(path: P, writable: bool) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(writable).open(path)?;
        Ok(Self::wrap_file(file))
    }

    /// In-memory stream positioned at the start of `data`
    pub fn memory(data: Vec<u8>) -> Self {
        Self::from_medium(Medium::Memory(Cursor::new(data)))
    }

    /// Restrict `inner` to the window `[start, end)`, or `[start, ..)` when
    /// `end` is `None`. The view does not own `inner`; closing the view
    /// leaves `inner` open.
    pub fn restricted(
        inner: &SharedStream,
        start: u64,
        end: Option<u64>,
        read_only: bool,
    ) -> io::Result<Self> {
        let view = RestrictedView::new(Rc::clone(inner), start, end, read_only)?;
        Ok(Self::from_medium(Medium::Restricted(view)))
    }

    /// Move this stream behind a shared handle so views can be opened on it
    pub fn shared(self) -> SharedStream {
        Rc::new(RefCell::new(self))
    }

    /// Register the close hook, replacing any previous one
    pub fn on_close<F>(&mut self, hook: F)
    where
        F: FnOnce(&mut Stream) + 'static,
    {
        self.on_close = Some(Box::new(hook));
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.medium, Medium::Closed)
    }

    /// The restricted view behind this stream, if any
    pub fn as_restricted(&self) -> Option<&RestrictedView> {
        match &self.medium {
            Medium::Restricted(view) => Some(view),
            _ => None,
        }
    }

    /// Current position
    pub fn tell(&mut self) -> io::Result<u64> {
        match &mut self.medium {
            Medium::File(f) => f.stream_position(),
            Medium::Memory(c) => Ok(c.position()),
            Medium::Restricted(v) => Ok(v.position()),
            Medium::Closed => Err(closed_error()),
        }
    }

    /// Total length of the stream
    pub fn len(&mut self) -> io::Result<u64> {
        match &mut self.medium {
            Medium::File(f) => Ok(f.metadata()?.len()),
            Medium::Memory(c) => Ok(c.get_ref().len() as u64),
            Medium::Restricted(v) => v.len(),
            Medium::Closed => Err(closed_error()),
        }
    }

    pub fn is_empty(&mut self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Truncate at the current position
    pub fn truncate(&mut self) -> io::Result<()> {
        match &mut self.medium {
            Medium::File(f) => {
                let pos = f.stream_position()?;
                f.set_len(pos)
            }
            Medium::Memory(c) => {
                let pos = c.position() as usize;
                c.get_mut().truncate(pos);
                Ok(())
            }
            Medium::Restricted(v) => v.truncate(),
            Medium::Closed => Err(closed_error()),
        }
    }

    /// Push written data down to the medium
    pub fn sync(&mut self) -> io::Result<()> {
        match &mut self.medium {
            Medium::File(f) => {
                f.flush()?;
                f.sync_data()
            }
            Medium::Memory(_) => Ok(()),
            Medium::Restricted(v) => v.sync(),
            Medium::Closed => Err(closed_error()),
        }
    }

    /// Close the stream and fire the close hook. Closing twice is a no-op.
    ///
    /// The medium is dropped here rather than with the stream, so a file
    /// handle is released even while views still share this stream.
    pub fn close(&mut self) -> io::Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        let flushed = self.flush();
        if let Some(hook) = self.on_close.take() {
            hook(self);
        }
        self.medium = Medium::Closed;
        flushed
    }

    /// Borrow the buffer of a memory stream
    pub fn buffer(&self) -> Option<&[u8]> {
        match &self.medium {
            Medium::Memory(c) => Some(c.get_ref().as_slice()),
            _ => None,
        }
    }

    /// Take the buffer of a memory stream
    pub fn into_inner(mut self) -> Option<Vec<u8>> {
        match &mut self.medium {
            Medium::Memory(c) => Some(std::mem::take(c.get_mut())),
            _ => None,
        }
    }

    /// Read everything from the current position to the end
    pub fn read_all(&mut self) -> io::Result<Vec<u8>> {
        let mut data = Vec::new();
        self.read_to_end(&mut data)?;
        Ok(data)
    }
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "stream is closed")
}

/// Copy the rest of `from` into `to`, returning the byte count
pub fn copy(from: &mut Stream, to: &mut Stream) -> io::Result<u64> {
    io::copy(from, to)
}

/// Like [`copy`], with an explicit chunk size
pub fn copy_with_buffer(from: &mut Stream, to: &mut Stream, buf_size: usize) -> io::Result<u64> {
    let mut buf = vec![0u8; buf_size.max(1)];
    let mut total = 0u64;
    loop {
        let n = match from.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        to.write_all(&buf[..n])?;
        total += n as u64;
    }
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.medium {
            Medium::File(f) => f.read(buf),
            Medium::Memory(c) => c.read(buf),
            Medium::Restricted(v) => v.read(buf),
            Medium::Closed => Err(closed_error()),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.medium {
            Medium::File(f) => f.write(buf),
            Medium::Memory(c) => c.write(buf),
            Medium::Restricted(v) => v.write(buf),
            Medium::Closed => Err(closed_error()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.medium {
            Medium::File(f) => f.flush(),
            Medium::Memory(_) => Ok(()),
            Medium::Restricted(v) => v.flush(),
            Medium::Closed => Err(closed_error()),
        }
    }
}

impl Seek for Stream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match &mut self.medium {
            Medium::File(f) => f.seek(pos),
            Medium::Memory(c) => c.seek(pos),
            Medium::Restricted(v) => v.seek(pos),
            Medium::Closed => Err(closed_error()),
        }
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("error closing stream: {}", e);
        }
    }
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.medium {
            Medium::File(_) => f.debug_struct("Stream::File").finish(),
            Medium::Memory(c) => f
                .debug_struct("Stream::Memory")
                .field("len", &c.get_ref().len())
                .finish(),
            Medium::Restricted(v) => f
                .debug_struct("Stream::Restricted")
                .field("start", &v.start())
                .field("end", &v.end())
                .field("read_only", &v.is_read_only())
                .finish(),
            Medium::Closed => f.debug_struct("Stream::Closed").finish(),
        }
    }
}
