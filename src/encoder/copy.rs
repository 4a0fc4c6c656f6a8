//! Bulk copy into a [`Sink`].

use std::io::{self, Read, Write};

use bytes::Buf;

use super::source::{Encoder, State};
use crate::error::{CopyError, MultipartError, Result};
use crate::part::{Content, Part, Sink};

impl Encoder {
    /// Write the rest of the encoded message into `sink`.
    ///
    /// Continues from wherever reading left off: any staged heading bytes,
    /// then the active part, then every remaining part, then the trailer.
    /// Content is transferred through the first capability available:
    ///
    /// 1. the content's own [`Content::write_to`]
    /// 2. the sink's [`Sink::read_from`]
    /// 3. a reusable scratch buffer no larger than the content's remaining
    ///    length
    ///
    /// Returns the number of bytes written by this call.
    ///
    /// # Errors
    ///
    /// A [`CopyError`] holding the bytes written before the failure and
    /// the cause: `ClosedSource`, a sequence error, or `ContentIo` for
    /// content and sink failures. Those bytes are also counted by
    /// [`bytes_produced`](Encoder::bytes_produced). Staged heading bytes the
    /// sink did not accept are kept for the next call.
    pub fn write_to<S: Sink>(&mut self, sink: &mut S) -> std::result::Result<u64, CopyError> {
        let mut written = 0u64;
        match self.copy_remaining(sink, &mut written) {
            Ok(()) => Ok(written),
            Err(error) => {
                tracing::debug!("Bulk copy failed after {} byte(s): {}", written, error);
                Err(CopyError { written, error })
            }
        }
    }

    /// Encode the whole message into a fresh buffer.
    pub fn encode_to_vec(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }

    fn copy_remaining<S: Sink>(&mut self, sink: &mut S, written: &mut u64) -> Result<()> {
        if let Some(e) = self.deferred.take() {
            return Err(e.into());
        }
        if self.state == State::Closed {
            return Err(MultipartError::ClosedSource);
        }

        loop {
            if !self.staging.is_empty() {
                let mut out = Tally::new(&mut *sink);
                let result = out.write_all(&self.staging);
                let n = out.count;
                self.staging.advance(n as usize);
                self.record(n, written);
                result?;
            }

            match self.state {
                State::Finalizing => {
                    self.state = State::Done;
                    sink.flush()?;
                    return Ok(());
                }
                State::Done => return Ok(()),
                State::Heading | State::Streaming => {
                    self.state = State::Streaming;
                    if let Some(mut part) = self.active.take() {
                        self.copy_content(&mut part, sink, written)?;
                    }
                    self.advance()?;
                }
                State::Idle => self.advance()?,
                State::Closed => return Err(MultipartError::ClosedSource),
            }
        }
    }

    fn record(&mut self, n: u64, written: &mut u64) {
        *written += n;
        self.produced += n;
    }

    fn copy_content<S: Sink>(&mut self, part: &mut Part, sink: &mut S, written: &mut u64) -> Result<()> {
        let Some(content) = part.content_mut() else {
            return Ok(());
        };

        let mut out = Tally::new(&mut *sink);
        let direct = content.write_to(&mut out);
        self.record(out.count, written);
        if let Some(result) = direct {
            tracing::trace!("Content copied through its own writer");
            result?;
            return Ok(());
        }

        let mut source = Tally::new(&mut *content);
        let pulled = sink.read_from(&mut source);
        self.record(source.count, written);
        if let Some(result) = pulled {
            tracing::trace!("Content copied through the sink's reader");
            result?;
            return Ok(());
        }

        let limit = self.config.copy_buffer_size.max(1);
        let size = match content.remaining_hint() {
            Some(remaining) => (remaining.min(limit as u64) as usize).max(1),
            None => limit,
        };
        if self.scratch.len() < size {
            self.scratch.resize(size, 0);
        }
        tracing::trace!("Content copied through a {} byte buffer", size);
        let mut out = Tally::new(&mut *sink);
        let result = copy_through(content, &mut out, &mut self.scratch[..size]);
        self.record(out.count, written);
        Ok(result?)
    }
}

/// Reader or writer adapter counting the bytes it moves.
struct Tally<T> {
    inner: T,
    count: u64,
}

impl<T> Tally<T> {
    fn new(inner: T) -> Self {
        Self { inner, count: 0 }
    }
}

impl<W: Write> Write for Tally<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<R: Read> Read for Tally<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}

fn copy_through(source: &mut dyn Content, sink: &mut dyn Write, buf: &mut [u8]) -> io::Result<()> {
    loop {
        match source.read(buf) {
            Ok(0) => return Ok(()),
            Ok(n) => sink.write_all(&buf[..n])?,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}
