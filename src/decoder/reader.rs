//! Part sequence over a blocking reader.
//!
//! Parts are yielded as soon as their header block is parsed. Each part's
//! content reads straight from the shared input until the next delimiter,
//! so bodies of any size pass through with bounded memory. Pulling the
//! next part discards whatever the previous content did not read, after
//! which the old content stream reports end of file.

use std::io::{self, Read};
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::BytesMut;
use serde::{Deserialize, Serialize};

use super::part_buffer::{
    BodyRead, DecodedPart, PartBuffer, DEFAULT_MAX_HEADER_BYTES, DEFAULT_MAX_PART_BYTES,
};
use crate::error::{MultipartError, Result};
use crate::header::HeaderMap;
use crate::part::{Content, Part};
use crate::sequence::PartSequence;

/// Default size of each read from the underlying reader.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 8 * 1024;

/// Decoder tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Bytes requested per read.
    pub read_chunk_size: usize,
    /// Largest accepted header block per part.
    pub max_header_bytes: usize,
    /// Largest content accepted by [`PartReader::next_buffered`].
    /// Streamed content is not limited.
    pub max_part_bytes: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
            max_part_bytes: DEFAULT_MAX_PART_BYTES,
        }
    }
}

/// Input state shared by a reader and the content of its current part.
struct Shared<R> {
    /// `None` at end of input, after an error, or once stopped.
    reader: Option<R>,
    finished: bool,
    buffer: PartBuffer,
    chunk: Vec<u8>,
    /// Index of the part whose content may still read.
    current: u64,
    max_part_bytes: usize,
}

impl<R: Read> Shared<R> {
    /// Read more input. `Ok(false)` once none is left.
    fn fill(&mut self) -> Result<bool> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(false);
        };
        loop {
            match reader.read(&mut self.chunk) {
                Ok(0) => {
                    self.reader = None;
                    return Ok(false);
                }
                Ok(n) => {
                    self.buffer.extend(&self.chunk[..n]);
                    return Ok(true);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    self.reader = None;
                    return Err(e.into());
                }
            }
        }
    }

    /// Skip the rest of the current body and parse the next header block.
    fn advance(&mut self) -> Result<Option<HeaderMap>> {
        loop {
            if self.buffer.skip_body() {
                if let Some(header) = self.buffer.next_header()? {
                    return Ok(Some(header));
                }
                if self.buffer.is_done() {
                    return Ok(None);
                }
            }
            if !self.fill()? {
                self.buffer.finish()?;
                return Ok(None);
            }
        }
    }

    fn next_header(&mut self) -> Option<Result<HeaderMap>> {
        if self.finished {
            return None;
        }
        self.current += 1;
        match self.advance() {
            Ok(Some(header)) => Some(Ok(header)),
            Ok(None) => {
                self.finish();
                None
            }
            Err(e) => {
                tracing::warn!("Multipart decoding failed: {}", e);
                self.finish();
                Some(Err(e))
            }
        }
    }

    /// Read content of the current body; `Ok(0)` at its end.
    fn read_body(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            match self.buffer.read_body(buf) {
                BodyRead::Data(n) => return Ok(n),
                BodyRead::End => return Ok(0),
                BodyRead::NeedMore => {
                    if !self.fill()? {
                        self.buffer.finish()?;
                        return Ok(0);
                    }
                }
            }
        }
    }

    fn read_whole_body(&mut self) -> Result<BytesMut> {
        let mut body = BytesMut::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = self.read_body(&mut buf)?;
            if n == 0 {
                return Ok(body);
            }
            if body.len() + n > self.max_part_bytes {
                return Err(MultipartError::LimitExceeded {
                    what: "part",
                    limit: self.max_part_bytes,
                });
            }
            body.extend_from_slice(&buf[..n]);
        }
    }
}

impl<R> Shared<R> {
    fn finish(&mut self) {
        self.finished = true;
        self.reader = None;
    }
}

fn lock<R>(shared: &Mutex<Shared<R>>) -> MutexGuard<'_, Shared<R>> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Content of one decoded part, read from the shared input.
struct PartBody<R> {
    shared: Arc<Mutex<Shared<R>>>,
    index: u64,
}

impl<R: Read> Read for PartBody<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut shared = lock(&self.shared);
        if shared.finished || shared.current != self.index {
            return Ok(0);
        }
        Ok(shared.read_body(buf)?)
    }
}

impl<R: Read + Send> Content for PartBody<R> {}

/// Parts decoded from a multipart body, in wire order.
///
/// Usable directly as the input of an [`Encoder`](crate::Encoder) (for
/// example to re-frame a body with a new boundary) or as a plain iterator.
/// A part's content is only readable until the next part is pulled; use
/// [`next_buffered`](PartReader::next_buffered) to keep bodies around.
/// The first error ends the sequence.
///
/// # Example
///
/// ```
/// use std::io::Read;
/// use partstream::decoder::parts_from_reader;
///
/// let body: &[u8] = b"--b\r\nX-Id: 1\r\n\r\none\r\n--b--\r\n";
/// let mut parts = parts_from_reader(body, "b").unwrap();
///
/// let mut part = parts.next().unwrap().unwrap();
/// assert_eq!(part.header().get("X-Id"), Some("1"));
/// let mut content = String::new();
/// part.content_mut().unwrap().read_to_string(&mut content).unwrap();
/// assert_eq!(content, "one");
/// assert!(parts.next().is_none());
/// ```
pub struct PartReader<R> {
    shared: Arc<Mutex<Shared<R>>>,
    decoded: u64,
}

impl<R: Read> PartReader<R> {
    /// Decode `reader` with the given boundary and default limits.
    pub fn new(reader: R, boundary: &str) -> Result<Self> {
        Self::with_config(reader, boundary, DecoderConfig::default())
    }

    /// Decode `reader` with the given boundary and configuration.
    ///
    /// # Errors
    ///
    /// `InvalidBoundaryLength` for an empty boundary.
    pub fn with_config(reader: R, boundary: &str, config: DecoderConfig) -> Result<Self> {
        if boundary.is_empty() {
            return Err(MultipartError::InvalidBoundaryLength(0));
        }
        let shared = Shared {
            reader: Some(reader),
            finished: false,
            buffer: PartBuffer::with_limits(
                boundary,
                config.max_header_bytes,
                config.max_part_bytes,
            ),
            chunk: vec![0u8; config.read_chunk_size.max(1)],
            current: 0,
            max_part_bytes: config.max_part_bytes,
        };
        Ok(Self {
            shared: Arc::new(Mutex::new(shared)),
            decoded: 0,
        })
    }

    /// Decode `reader` using the boundary named by a `multipart/*`
    /// `Content-Type` value.
    pub fn from_content_type(reader: R, content_type: &str) -> Result<Self> {
        let boundary = super::parse_boundary(content_type)?;
        Self::new(reader, &boundary)
    }

    /// Number of parts produced so far.
    #[inline]
    pub fn decoded(&self) -> u64 {
        self.decoded
    }

    /// Next part with its whole content read into memory.
    ///
    /// # Errors
    ///
    /// `LimitExceeded` when the content is larger than
    /// [`DecoderConfig::max_part_bytes`]; this also ends the sequence.
    pub fn next_buffered(&mut self) -> Option<Result<DecodedPart>> {
        let mut shared = lock(&self.shared);
        let header = match shared.next_header()? {
            Ok(header) => header,
            Err(e) => return Some(Err(e)),
        };
        self.decoded += 1;
        match shared.read_whole_body() {
            Ok(body) => Some(Ok(DecodedPart {
                header,
                body: body.freeze(),
            })),
            Err(e) => {
                tracing::warn!("Multipart decoding failed: {}", e);
                shared.finish();
                Some(Err(e))
            }
        }
    }
}

impl<R: Read + Send + 'static> PartSequence for PartReader<R> {
    fn next_part(&mut self) -> Option<Result<Part>> {
        let (header, index) = {
            let mut shared = lock(&self.shared);
            match shared.next_header()? {
                Ok(header) => (header, shared.current),
                Err(e) => return Some(Err(e)),
            }
        };
        self.decoded += 1;
        let body = PartBody {
            shared: Arc::clone(&self.shared),
            index,
        };
        Some(Ok(Part::from_parts(header, Some(Box::new(body)))))
    }

    fn stop(&mut self) {
        tracing::debug!("Part reader stopped after {} part(s)", self.decoded);
        lock(&self.shared).finish();
    }
}

impl<R: Read + Send + 'static> Iterator for PartReader<R> {
    type Item = Result<Part>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_part()
    }
}

/// Decode parts from `reader` delimited by `boundary`.
pub fn parts_from_reader<R: Read>(reader: R, boundary: &str) -> Result<PartReader<R>> {
    PartReader::new(reader, boundary)
}
