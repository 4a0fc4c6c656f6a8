//! Content streams and sinks with optional fast-path capabilities.
//!
//! A [`Content`] is a [`Read`] that can additionally advertise:
//!
//! - `remaining_hint`: bytes left, when known without reading
//! - `write_to`: push the rest of the stream straight into a writer
//! - `unread`: step back over bytes that were just read
//!
//! A [`Sink`] is a [`Write`] that may pull directly from a reader
//! (`read_from`). Every hook defaults to `None` ("not supported"), so plain
//! types only need an empty `impl`.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Cursor, Read, Seek, SeekFrom, Write};
use std::net::TcpStream;

use bytes::Bytes;

/// Readable part content.
pub trait Content: Read + Send {
    /// Number of bytes left in the stream, if cheaply known.
    fn remaining_hint(&self) -> Option<u64> {
        None
    }

    /// Write the rest of the stream into `sink`, returning the byte count.
    ///
    /// Returns `None` when the content has no direct path.
    fn write_to(&mut self, _sink: &mut dyn Write) -> Option<io::Result<u64>> {
        None
    }

    /// Move the read position back by `n` bytes.
    ///
    /// Returns `None` when the content cannot rewind.
    fn unread(&mut self, _n: u64) -> Option<io::Result<()>> {
        None
    }
}

impl<C: Content + ?Sized> Content for Box<C> {
    fn remaining_hint(&self) -> Option<u64> {
        (**self).remaining_hint()
    }

    fn write_to(&mut self, sink: &mut dyn Write) -> Option<io::Result<u64>> {
        (**self).write_to(sink)
    }

    fn unread(&mut self, n: u64) -> Option<io::Result<()>> {
        (**self).unread(n)
    }
}

impl<T: AsRef<[u8]> + Send> Content for Cursor<T> {
    fn remaining_hint(&self) -> Option<u64> {
        let len = self.get_ref().as_ref().len() as u64;
        Some(len.saturating_sub(self.position()))
    }

    fn write_to(&mut self, sink: &mut dyn Write) -> Option<io::Result<u64>> {
        let data = self.get_ref().as_ref();
        let len = data.len() as u64;
        let start = self.position().min(len) as usize;
        let rest = &data[start..];
        let written = rest.len() as u64;
        if let Err(e) = sink.write_all(rest) {
            return Some(Err(e));
        }
        self.set_position(len);
        Some(Ok(written))
    }

    fn unread(&mut self, n: u64) -> Option<io::Result<()>> {
        let pos = self.position();
        if n > pos {
            return Some(Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "unread before start of content",
            )));
        }
        self.set_position(pos - n);
        Some(Ok(()))
    }
}

impl Content for File {
    fn remaining_hint(&self) -> Option<u64> {
        let len = self.metadata().ok()?.len();
        let mut handle = self;
        let pos = handle.stream_position().ok()?;
        Some(len.saturating_sub(pos))
    }

    fn unread(&mut self, n: u64) -> Option<io::Result<()>> {
        let offset = match i64::try_from(n) {
            Ok(offset) => offset,
            Err(_) => {
                return Some(Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "unread offset too large",
                )))
            }
        };
        Some(self.seek(SeekFrom::Current(-offset)).map(|_| ()))
    }
}

impl<R: Content> Content for io::Take<R> {
    fn remaining_hint(&self) -> Option<u64> {
        let limit = self.limit();
        Some(match self.get_ref().remaining_hint() {
            Some(inner) => inner.min(limit),
            None => limit,
        })
    }

    fn unread(&mut self, n: u64) -> Option<io::Result<()>> {
        match self.get_mut().unread(n)? {
            Ok(()) => {
                let limit = self.limit();
                self.set_limit(limit + n);
                Some(Ok(()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

impl<R: Content> Content for BufReader<R> {
    fn remaining_hint(&self) -> Option<u64> {
        let inner = self.get_ref().remaining_hint()?;
        Some(inner + self.buffer().len() as u64)
    }
}

impl Content for io::Empty {
    fn remaining_hint(&self) -> Option<u64> {
        Some(0)
    }
}

/// Adapter giving any reader the [`Content`] interface without capabilities.
#[derive(Debug)]
pub struct ReaderContent<R>(pub R);

impl<R: Read> Read for ReaderContent<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl<R: Read + Send> Content for ReaderContent<R> {}

/// Content with already-read bytes put back in front of the rest.
///
/// Produced by content-type sniffing when the underlying stream cannot
/// rewind. An error hit while peeking is held back and reported once the
/// peeked bytes have been delivered.
pub struct Prefixed {
    head: Bytes,
    pending_error: Option<io::Error>,
    rest: Box<dyn Content>,
}

impl Prefixed {
    /// Serve `head` first, then `rest`.
    pub fn new(head: impl Into<Bytes>, rest: Box<dyn Content>) -> Self {
        Self {
            head: head.into(),
            pending_error: None,
            rest,
        }
    }

    /// Like [`Prefixed::new`], reporting `error` after `head` is drained.
    pub fn with_error(head: impl Into<Bytes>, error: io::Error, rest: Box<dyn Content>) -> Self {
        Self {
            head: head.into(),
            pending_error: Some(error),
            rest,
        }
    }

    /// Unread prefix bytes.
    pub fn head(&self) -> &[u8] {
        &self.head
    }
}

impl Read for Prefixed {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if !self.head.is_empty() {
            let n = self.head.len().min(buf.len());
            buf[..n].copy_from_slice(&self.head[..n]);
            let _ = self.head.split_to(n);
            return Ok(n);
        }
        if let Some(e) = self.pending_error.take() {
            return Err(e);
        }
        self.rest.read(buf)
    }
}

impl Content for Prefixed {
    fn remaining_hint(&self) -> Option<u64> {
        if self.pending_error.is_some() {
            return None;
        }
        let rest = self.rest.remaining_hint()?;
        Some(self.head.len() as u64 + rest)
    }

    fn write_to(&mut self, sink: &mut dyn Write) -> Option<io::Result<u64>> {
        let mut total = 0u64;
        while !self.head.is_empty() {
            match sink.write(&self.head) {
                Ok(0) => return Some(Err(io::ErrorKind::WriteZero.into())),
                Ok(n) => {
                    let _ = self.head.split_to(n);
                    total += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Some(Err(e)),
            }
        }
        if let Some(e) = self.pending_error.take() {
            return Some(Err(e));
        }
        let rest = match self.rest.write_to(sink) {
            Some(result) => result,
            None => io::copy(&mut self.rest, sink),
        };
        match rest {
            Ok(n) => {
                total += n;
                Some(Ok(total))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Writable destination for bulk copies.
pub trait Sink: Write {
    /// Read all of `source` directly into the sink, returning the byte count.
    ///
    /// Returns `None` when the sink has no direct path.
    fn read_from(&mut self, _source: &mut dyn Read) -> Option<io::Result<u64>> {
        None
    }
}

impl Sink for Vec<u8> {
    fn read_from(&mut self, source: &mut dyn Read) -> Option<io::Result<u64>> {
        Some(source.read_to_end(self).map(|n| n as u64))
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn read_from(&mut self, source: &mut dyn Read) -> Option<io::Result<u64>> {
        (**self).read_from(source)
    }
}

impl Sink for Cursor<Vec<u8>> {}
impl Sink for Cursor<&mut Vec<u8>> {}
impl Sink for Cursor<&mut [u8]> {}
impl Sink for File {}
impl Sink for TcpStream {}
impl Sink for io::Sink {}
impl Sink for io::Stdout {}
impl Sink for io::Stderr {}
impl<W: Write> Sink for BufWriter<W> {}

/// Adapter giving any writer the [`Sink`] interface without capabilities.
#[derive(Debug)]
pub struct PlainSink<W>(pub W);

impl<W: Write> Write for PlainSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl<W: Write> Sink for PlainSink<W> {}
