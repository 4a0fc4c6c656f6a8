//! Incremental multipart body parser.
//!
//! Uses `bytes::BytesMut` for buffer management and a small state machine to
//! cope with arbitrary fragmentation:
//! - `Preamble`: looking for the first `--boundary` line
//! - `Headers`: delimiter consumed, waiting for the blank line ending the
//!   header block
//! - `Body`: collecting content until the next `\r\n--boundary`
//! - `Done`: close delimiter seen; the epilogue is ignored
//!
//! Whole parts come out of [`PartBuffer::push`] / [`PartBuffer::try_next`].
//! Streaming consumers use [`PartBuffer::next_header`] and
//! [`PartBuffer::read_body`] instead, which never hold more than the
//! unparsed input. The two styles must not be mixed within one part.
//!
//! # Example
//!
//! ```
//! use partstream::decoder::PartBuffer;
//!
//! let mut buffer = PartBuffer::new("b");
//! let mut parts = buffer.push(b"--b\r\nContent-Type: text/plain\r\n\r\nhi").unwrap();
//! assert!(parts.is_empty());
//!
//! parts = buffer.push(b"\r\n--b--\r\n").unwrap();
//! assert_eq!(&parts[0].body[..], b"hi");
//! assert!(buffer.is_done());
//! ```

use std::io::Cursor;

use bytes::{Buf, Bytes, BytesMut};

use crate::error::{MultipartError, Result};
use crate::header::HeaderMap;
use crate::part::Part;

/// Default limit for one part's header block.
pub const DEFAULT_MAX_HEADER_BYTES: usize = 16 * 1024;

/// Default limit for one part's content.
pub const DEFAULT_MAX_PART_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Preamble,
    Headers,
    Body,
    Done,
}

/// What follows a boundary match.
enum Tail {
    /// Another part follows; consume this many bytes after the boundary.
    Part(usize),
    /// Close delimiter; consume this many bytes after the boundary.
    Close(usize),
    NeedMore,
    /// The match is ordinary content.
    NotDelimiter,
}

/// Where the current body ends, as far as the buffer shows.
enum BodyScan {
    /// Content bytes, then a delimiter with `tail` bytes to consume.
    Delimiter {
        content: usize,
        tail: usize,
        close: bool,
    },
    /// This many leading bytes are certainly content.
    Content(usize),
}

/// Outcome of [`PartBuffer::read_body`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyRead {
    /// Bytes copied into the output.
    Data(usize),
    /// The current body is complete.
    End,
    /// More input is needed before anything can be returned.
    NeedMore,
}

/// One fully received part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPart {
    /// Parsed header lines.
    pub header: HeaderMap,
    /// Raw content bytes.
    pub body: Bytes,
}

impl DecodedPart {
    /// Convert into a [`Part`] whose content is an in-memory cursor.
    pub fn into_part(self) -> Part {
        Part::from_parts(self.header, Some(Box::new(Cursor::new(self.body))))
    }
}

/// Buffer for accumulating incoming bytes and extracting complete parts.
pub struct PartBuffer {
    buffer: BytesMut,
    /// Content of the part being received.
    body: BytesMut,
    header: HeaderMap,
    state: State,
    /// Whether `buffer[0]` begins a line while in the preamble.
    line_start: bool,
    /// `--boundary`
    dash_boundary: Vec<u8>,
    /// `\r\n--boundary`
    delimiter: Vec<u8>,
    max_header_bytes: usize,
    max_part_bytes: usize,
}

impl PartBuffer {
    /// Parser for `boundary` with default limits.
    pub fn new(boundary: &str) -> Self {
        Self::with_limits(boundary, DEFAULT_MAX_HEADER_BYTES, DEFAULT_MAX_PART_BYTES)
    }

    /// Parser for `boundary` with custom limits.
    pub fn with_limits(boundary: &str, max_header_bytes: usize, max_part_bytes: usize) -> Self {
        let mut dash_boundary = Vec::with_capacity(boundary.len() + 2);
        dash_boundary.extend_from_slice(b"--");
        dash_boundary.extend_from_slice(boundary.as_bytes());

        let mut delimiter = Vec::with_capacity(dash_boundary.len() + 2);
        delimiter.extend_from_slice(b"\r\n");
        delimiter.extend_from_slice(&dash_boundary);

        Self {
            buffer: BytesMut::with_capacity(8 * 1024),
            body: BytesMut::new(),
            header: HeaderMap::new(),
            state: State::Preamble,
            line_start: true,
            dash_boundary,
            delimiter,
            max_header_bytes,
            max_part_bytes,
        }
    }

    /// Push data and extract every part it completes.
    ///
    /// # Errors
    ///
    /// `Malformed` for broken header blocks, `LimitExceeded` when a header
    /// block or part grows past its limit.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<DecodedPart>> {
        self.extend(data);

        let mut parts = Vec::new();
        while let Some(part) = self.try_next()? {
            parts.push(part);
        }
        Ok(parts)
    }

    /// Append data without parsing it.
    pub fn extend(&mut self, data: &[u8]) {
        if self.state != State::Done {
            self.buffer.extend_from_slice(data);
        }
    }

    /// Extract the next complete part from buffered data, if any.
    pub fn try_next(&mut self) -> Result<Option<DecodedPart>> {
        loop {
            let progressed = match self.state {
                State::Preamble => self.skip_preamble(),
                State::Headers => self.parse_headers()?,
                State::Body => return self.take_body(),
                State::Done => return Ok(None),
            };
            if !progressed {
                return Ok(None);
            }
        }
    }

    /// Advance to the next part's header block and return it.
    ///
    /// Returns `None` when more input is needed, at the close delimiter,
    /// and while a body is still unread (see [`read_body`](Self::read_body)
    /// and [`skip_body`](Self::skip_body)).
    ///
    /// # Errors
    ///
    /// `Malformed` for broken header blocks, `LimitExceeded` for oversized
    /// ones.
    pub fn next_header(&mut self) -> Result<Option<HeaderMap>> {
        loop {
            let progressed = match self.state {
                State::Preamble => self.skip_preamble(),
                State::Headers => {
                    if self.parse_headers()? {
                        return Ok(Some(std::mem::take(&mut self.header)));
                    }
                    false
                }
                State::Body | State::Done => return Ok(None),
            };
            if !progressed {
                return Ok(None);
            }
        }
    }

    /// Copy content of the current body into `out`.
    ///
    /// Bytes that could still turn out to start a delimiter are held back
    /// until more input arrives. Returns `End` outside a body.
    pub fn read_body(&mut self, out: &mut [u8]) -> BodyRead {
        if self.state != State::Body {
            return BodyRead::End;
        }
        let available = match self.scan_body() {
            BodyScan::Delimiter { content: 0, tail, close } => {
                self.end_body(tail, close);
                return BodyRead::End;
            }
            BodyScan::Delimiter { content, .. } => content,
            BodyScan::Content(0) => return BodyRead::NeedMore,
            BodyScan::Content(len) => len,
        };
        let n = available.min(out.len());
        out[..n].copy_from_slice(&self.buffer[..n]);
        self.buffer.advance(n);
        BodyRead::Data(n)
    }

    /// Discard buffered content of the current body.
    ///
    /// Returns true once the body is complete, false if more input is
    /// needed to find its end.
    pub fn skip_body(&mut self) -> bool {
        if self.state != State::Body {
            return true;
        }
        match self.scan_body() {
            BodyScan::Delimiter { content, tail, close } => {
                self.buffer.advance(content);
                self.end_body(tail, close);
                true
            }
            BodyScan::Content(len) => {
                self.buffer.advance(len);
                false
            }
        }
    }

    /// Signal end of input.
    ///
    /// # Errors
    ///
    /// `Malformed` if the close delimiter has not been seen.
    pub fn finish(&self) -> Result<()> {
        match self.state {
            State::Done => Ok(()),
            State::Preamble => Err(MultipartError::Malformed(
                "input ended before the first boundary".to_string(),
            )),
            State::Headers => Err(MultipartError::Malformed(
                "input ended inside a part header".to_string(),
            )),
            State::Body => Err(MultipartError::Malformed(
                "input ended inside a part body".to_string(),
            )),
        }
    }

    /// True once the close delimiter has been consumed.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Bytes buffered but not yet parsed.
    #[inline]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn skip_preamble(&mut self) -> bool {
        let needle_len = self.dash_boundary.len();
        let mut from = 0;
        while let Some(pos) = find(&self.buffer, &self.dash_boundary, from) {
            let at_line_start = if pos == 0 {
                self.line_start
            } else {
                self.buffer[pos - 1] == b'\n'
            };
            if !at_line_start {
                from = pos + 1;
                continue;
            }
            match self.tail(pos + needle_len) {
                Tail::Part(n) => {
                    let _ = self.buffer.split_to(pos + needle_len + n);
                    self.state = State::Headers;
                    return true;
                }
                Tail::Close(n) => {
                    let _ = self.buffer.split_to(pos + needle_len + n);
                    self.finish_stream();
                    return true;
                }
                Tail::NeedMore => {
                    let _ = self.buffer.split_to(pos);
                    self.line_start = true;
                    return false;
                }
                Tail::NotDelimiter => from = pos + 1,
            }
        }

        // keep a tail that may hold the start of a split boundary line
        let keep = needle_len;
        if self.buffer.len() > keep {
            let discard = self.buffer.len() - keep;
            self.line_start = self.buffer[discard - 1] == b'\n';
            let _ = self.buffer.split_to(discard);
        }
        false
    }

    fn parse_headers(&mut self) -> Result<bool> {
        let (block_len, consumed) = if self.buffer.starts_with(b"\r\n") {
            (0, 2)
        } else {
            match find(&self.buffer, b"\r\n\r\n", 0) {
                Some(pos) => (pos, pos + 4),
                None => {
                    if self.buffer.len() > self.max_header_bytes {
                        return Err(MultipartError::LimitExceeded {
                            what: "part header",
                            limit: self.max_header_bytes,
                        });
                    }
                    return Ok(false);
                }
            }
        };
        if block_len > self.max_header_bytes {
            return Err(MultipartError::LimitExceeded {
                what: "part header",
                limit: self.max_header_bytes,
            });
        }

        let block = self.buffer.split_to(consumed);
        self.header = parse_header_block(&block[..block_len])?;
        self.state = State::Body;
        Ok(true)
    }

    fn take_body(&mut self) -> Result<Option<DecodedPart>> {
        match self.scan_body() {
            BodyScan::Delimiter { content, tail, close } => {
                let part = self.complete_part(content)?;
                self.end_body(tail, close);
                Ok(Some(part))
            }
            BodyScan::Content(len) => {
                self.move_to_body(len)?;
                Ok(None)
            }
        }
    }

    fn scan_body(&self) -> BodyScan {
        let delim_len = self.delimiter.len();
        let mut from = 0;
        while let Some(pos) = find(&self.buffer, &self.delimiter, from) {
            match self.tail(pos + delim_len) {
                Tail::Part(n) => {
                    return BodyScan::Delimiter {
                        content: pos,
                        tail: delim_len + n,
                        close: false,
                    }
                }
                Tail::Close(n) => {
                    return BodyScan::Delimiter {
                        content: pos,
                        tail: delim_len + n,
                        close: true,
                    }
                }
                Tail::NeedMore => return BodyScan::Content(pos),
                Tail::NotDelimiter => from = pos + 1,
            }
        }

        // everything but a possible delimiter prefix is content
        BodyScan::Content(self.buffer.len().saturating_sub(delim_len - 1))
    }

    /// Consume a delimiter found right at the start of the buffer.
    fn end_body(&mut self, tail: usize, close: bool) {
        self.buffer.advance(tail);
        if close {
            self.finish_stream();
        } else {
            self.state = State::Headers;
        }
    }

    /// Classify the bytes after a boundary match starting at `at`.
    fn tail(&self, at: usize) -> Tail {
        let rest = &self.buffer[at..];
        let padding = rest
            .iter()
            .take_while(|&&b| b == b' ' || b == b'\t')
            .count();
        let rest = &rest[padding..];
        match rest {
            [] | [b'\r'] | [b'-'] => Tail::NeedMore,
            [b'\r', b'\n', ..] => Tail::Part(padding + 2),
            [b'-', b'-', ..] => Tail::Close(padding + 2),
            _ => Tail::NotDelimiter,
        }
    }

    fn move_to_body(&mut self, len: usize) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        if self.body.len() + len > self.max_part_bytes {
            return Err(MultipartError::LimitExceeded {
                what: "part",
                limit: self.max_part_bytes,
            });
        }
        let chunk = self.buffer.split_to(len);
        if self.body.is_empty() {
            self.body = chunk;
        } else {
            self.body.extend_from_slice(&chunk);
        }
        Ok(())
    }

    fn complete_part(&mut self, body_end: usize) -> Result<DecodedPart> {
        self.move_to_body(body_end)?;
        let body = self.body.split().freeze();
        let header = std::mem::take(&mut self.header);
        tracing::trace!("Decoded part ({} header line(s), {} bytes)", header.line_count(), body.len());
        Ok(DecodedPart { header, body })
    }

    fn finish_stream(&mut self) {
        tracing::trace!("Close delimiter reached, {} epilogue byte(s) dropped", self.buffer.len());
        self.state = State::Done;
        self.buffer.clear();
    }
}

impl std::fmt::Debug for PartBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartBuffer")
            .field("state", &self.state)
            .field("buffered", &self.buffer.len())
            .field("body", &self.body.len())
            .finish()
    }
}

/// Parse `Key: value` lines separated by CRLF. Lines starting with
/// whitespace continue the previous value.
fn parse_header_block(block: &[u8]) -> Result<HeaderMap> {
    let text = std::str::from_utf8(block)
        .map_err(|_| MultipartError::Malformed("part header is not valid UTF-8".to_string()))?;

    let mut lines: Vec<(String, String)> = Vec::new();
    if text.is_empty() {
        return Ok(HeaderMap::new());
    }
    for line in text.split("\r\n") {
        if line.starts_with(' ') || line.starts_with('\t') {
            let Some((_, value)) = lines.last_mut() else {
                return Err(MultipartError::Malformed(
                    "header continuation without a preceding line".to_string(),
                ));
            };
            if !value.is_empty() {
                value.push(' ');
            }
            value.push_str(line.trim());
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            return Err(MultipartError::Malformed(format!(
                "header line without colon: {line:?}"
            )));
        };
        let key = key.trim_end();
        if key.is_empty() || key.contains(char::is_whitespace) {
            return Err(MultipartError::Malformed(format!("invalid header key: {key:?}")));
        }
        lines.push((key.to_string(), value.trim().to_string()));
    }

    Ok(lines.into_iter().collect())
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    const BODY: &[u8] = b"preamble text\r\n\
        --xyz\r\n\
        Content-Disposition: form-data; name=\"a\"\r\n\
        \r\n\
        first\r\n\
        --xyz\r\n\
        Content-Disposition: form-data; name=\"b\"; filename=\"b.txt\"\r\n\
        Content-Type: text/plain\r\n\
        \r\n\
        line\r\n--xy not a boundary\r\n\
        --xyz--\r\n\
        epilogue";

    fn decode_all(data: &[u8], chunk: usize) -> Vec<DecodedPart> {
        let mut buffer = PartBuffer::new("xyz");
        let mut parts = Vec::new();
        for piece in data.chunks(chunk) {
            parts.extend(buffer.push(piece).unwrap());
        }
        buffer.finish().unwrap();
        parts
    }

    #[test]
    fn test_decode_whole_body() {
        let parts = decode_all(BODY, BODY.len());
        assert_eq!(parts.len(), 2);

        assert_eq!(
            parts[0].header.get("content-disposition"),
            Some("form-data; name=\"a\"")
        );
        assert_eq!(&parts[0].body[..], b"first");

        assert_eq!(parts[1].header.get("Content-Type"), Some("text/plain"));
        assert_eq!(&parts[1].body[..], b"line\r\n--xy not a boundary");
    }

    #[test]
    fn test_one_byte_fragmentation() {
        assert_eq!(decode_all(BODY, 1), decode_all(BODY, BODY.len()));
    }

    #[test]
    fn test_every_chunk_size_agrees() {
        let expected = decode_all(BODY, BODY.len());
        for chunk in 2..BODY.len() {
            assert_eq!(decode_all(BODY, chunk), expected, "chunk size {chunk}");
        }
    }

    #[test]
    fn test_part_without_headers_or_content() {
        let parts = decode_all(b"--xyz\r\n\r\n\r\n--xyz--", 3);
        assert_eq!(parts.len(), 1);
        assert!(parts[0].header.is_empty());
        assert!(parts[0].body.is_empty());
    }

    #[test]
    fn test_empty_message() {
        let parts = decode_all(b"--xyz--\r\n", 4);
        assert!(parts.is_empty());
    }

    #[test]
    fn test_transport_padding_after_delimiter() {
        let parts = decode_all(b"--xyz  \r\nA: 1\r\n\r\nv\r\n--xyz\t--\r\n", 5);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].header.get("A"), Some("1"));
        assert_eq!(&parts[0].body[..], b"v");
    }

    #[test]
    fn test_folded_header_value() {
        let parts = decode_all(b"--xyz\r\nX-Long: one\r\n two\r\n\r\nv\r\n--xyz--", 64);
        assert_eq!(parts[0].header.get("X-Long"), Some("one two"));
    }

    #[test]
    fn test_repeated_header_keeps_all_values() {
        let parts = decode_all(b"--xyz\r\nX-Tag: a\r\nx-tag: b\r\n\r\n\r\n--xyz--", 64);
        assert_eq!(parts[0].header.get_all("X-Tag"), ["a", "b"]);
    }

    #[test]
    fn test_boundary_inside_preamble_line_is_ignored() {
        let data = b"noise--xyz\r\n--xyz\r\n\r\nreal\r\n--xyz--";
        for chunk in 1..data.len() {
            let parts = decode_all(data, chunk);
            assert_eq!(parts.len(), 1, "chunk size {chunk}");
            assert_eq!(&parts[0].body[..], b"real");
        }
    }

    #[test]
    fn test_truncated_input_is_rejected() {
        for cut in [3, 12, 30, BODY.len() - 12] {
            let mut buffer = PartBuffer::new("xyz");
            let _ = buffer.push(&BODY[..cut]).unwrap();
            assert!(
                matches!(buffer.finish(), Err(MultipartError::Malformed(_))),
                "cut at {cut}"
            );
        }
    }

    #[test]
    fn test_header_line_without_colon() {
        let mut buffer = PartBuffer::new("xyz");
        let result = buffer.push(b"--xyz\r\nbroken header\r\n\r\n");
        assert!(matches!(result, Err(MultipartError::Malformed(_))));
    }

    #[test]
    fn test_header_limit() {
        let mut buffer = PartBuffer::with_limits("xyz", 16, 1024);
        let result = buffer.push(b"--xyz\r\nX-Very-Long-Header: 0123456789");
        assert!(matches!(
            result,
            Err(MultipartError::LimitExceeded { what: "part header", limit: 16 })
        ));
    }

    #[test]
    fn test_part_limit() {
        let mut buffer = PartBuffer::with_limits("xyz", 1024, 8);
        let result = buffer.push(b"--xyz\r\n\r\n0123456789abcdef0123456789\r\n--xyz--");
        assert!(matches!(
            result,
            Err(MultipartError::LimitExceeded { what: "part", limit: 8 })
        ));
    }

    #[test]
    fn test_input_after_close_is_ignored() {
        let mut buffer = PartBuffer::new("xyz");
        buffer.push(b"--xyz--\r\n").unwrap();
        assert!(buffer.push(b"--xyz\r\n\r\nlate\r\n--xyz--").unwrap().is_empty());
        assert_eq!(buffer.buffered(), 0);
    }

    /// Feed `data` in `chunk`-sized pieces through the streaming API, reading
    /// bodies `out`-sized bytes at a time.
    fn stream_all(data: &[u8], chunk: usize, out: usize) -> Vec<DecodedPart> {
        let mut buffer = PartBuffer::new("xyz");
        let mut pieces = data.chunks(chunk);
        let mut parts = Vec::new();
        let mut current: Option<(HeaderMap, Vec<u8>)> = None;
        let mut scratch = vec![0u8; out];
        loop {
            if let Some((_, body)) = current.as_mut() {
                match buffer.read_body(&mut scratch) {
                    BodyRead::Data(n) => {
                        assert!(n > 0);
                        body.extend_from_slice(&scratch[..n]);
                        continue;
                    }
                    BodyRead::End => {
                        let (header, body) = current.take().unwrap();
                        parts.push(DecodedPart {
                            header,
                            body: Bytes::from(body),
                        });
                        continue;
                    }
                    BodyRead::NeedMore => {}
                }
            } else if let Some(header) = buffer.next_header().unwrap() {
                current = Some((header, Vec::new()));
                continue;
            } else if buffer.is_done() {
                break;
            }
            match pieces.next() {
                Some(piece) => buffer.extend(piece),
                None => break,
            }
        }
        buffer.finish().unwrap();
        parts
    }

    #[test]
    fn test_streaming_matches_whole_parts() {
        let expected = decode_all(BODY, BODY.len());
        for chunk in [1, 2, 5, 11, BODY.len()] {
            for out in [1, 3, 64] {
                assert_eq!(stream_all(BODY, chunk, out), expected, "chunk {chunk}, out {out}");
            }
        }
    }

    #[test]
    fn test_streaming_ignores_part_limit() {
        let mut data = b"--xyz\r\n\r\n".to_vec();
        data.extend_from_slice(&[b'a'; 100]);
        data.extend_from_slice(b"\r\n--xyz--");

        let mut buffer = PartBuffer::with_limits("xyz", 1024, 8);
        buffer.extend(&data);
        assert!(buffer.next_header().unwrap().is_some());
        let mut out = [0u8; 256];
        assert_eq!(buffer.read_body(&mut out), BodyRead::Data(100));
        assert_eq!(buffer.read_body(&mut out), BodyRead::End);
        assert!(buffer.is_done());
    }

    #[test]
    fn test_body_holds_back_possible_delimiter() {
        let mut buffer = PartBuffer::new("xyz");
        buffer.extend(b"--xyz\r\n\r\nabc\r\n--x");
        assert!(buffer.next_header().unwrap().is_some());

        let mut out = [0u8; 16];
        assert_eq!(buffer.read_body(&mut out), BodyRead::Data(2));
        assert_eq!(&out[..2], b"ab");
        assert_eq!(buffer.read_body(&mut out), BodyRead::NeedMore);

        buffer.extend(b"y not it\r\n--xyz--");
        assert_eq!(buffer.read_body(&mut out), BodyRead::Data(15));
        assert_eq!(&out[..15], b"c\r\n--xy not it");
        assert_eq!(buffer.read_body(&mut out), BodyRead::End);
    }

    #[test]
    fn test_skip_body_moves_to_next_header() {
        let mut buffer = PartBuffer::new("xyz");
        buffer.extend(&BODY[..70]);
        let first = buffer.next_header().unwrap().unwrap();
        assert_eq!(first.get("Content-Disposition"), Some("form-data; name=\"a\""));
        assert!(buffer.next_header().unwrap().is_none());

        buffer.extend(&BODY[70..]);
        assert!(buffer.skip_body());
        let second = buffer.next_header().unwrap().unwrap();
        assert_eq!(second.get("Content-Type"), Some("text/plain"));
        assert!(buffer.skip_body());
        assert!(buffer.is_done());
    }

    #[test]
    fn test_into_part_exposes_content() {
        let mut parts = decode_all(BODY, 7);
        let mut part = parts.remove(1).into_part();
        assert_eq!(part.file_name().as_deref(), Some("b.txt"));
        assert_eq!(part.form_name().as_deref(), Some("b"));

        let mut content = String::new();
        part.content_mut().unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "line\r\n--xy not a boundary");
    }
}
