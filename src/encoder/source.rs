//! Encoder state machine and the `io::Read` path.

use std::fmt;
use std::io::{self, Read};

use bytes::{Buf, BytesMut};
use serde::{Deserialize, Serialize};

use crate::boundary::{Boundary, OsRandom, RandomSource};
use crate::error::{MultipartError, Result};
use crate::header::HeaderMap;
use crate::part::Part;
use crate::sequence::{PartSequence, Pull};

/// Default upper bound for the bulk-copy scratch buffer (32 KiB).
pub const DEFAULT_COPY_BUFFER_SIZE: usize = 32 * 1024;

/// Initial staging capacity; a heading rarely needs more.
const STAGING_CAPACITY: usize = 512;

/// Encoder tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Upper bound for the scratch buffer used when neither the content nor
    /// the sink offers a direct copy path. Zero is treated as one.
    pub copy_buffer_size: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            copy_buffer_size: DEFAULT_COPY_BUFFER_SIZE,
        }
    }
}

/// Encoder lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Nothing pulled yet; the boundary can still be replaced.
    Idle,
    /// A part heading is staged and not fully delivered.
    Heading,
    /// Delivering the active part's content.
    Streaming,
    /// Sequence exhausted; delivering the trailer.
    Finalizing,
    /// Trailer delivered; end of stream.
    Done,
    /// Closed by the caller.
    Closed,
}

/// Streaming multipart/form-data producer.
///
/// # Example
///
/// ```
/// use std::io::Read;
/// use partstream::{part_seq, Encoder, Part};
///
/// let parts = part_seq(vec![Part::new()
///     .with_form_name("greeting")
///     .with_content_string("hello")]);
/// let mut encoder = Encoder::new(parts).unwrap();
///
/// let mut body = String::new();
/// encoder.read_to_string(&mut body).unwrap();
/// assert!(body.ends_with(&format!("\r\n--{}--\r\n", encoder.boundary())));
/// ```
pub struct Encoder {
    /// `None` once closed.
    pub(super) boundary: Option<Boundary>,
    pub(super) pull: Pull,
    /// Formatted heading or trailer bytes not yet delivered.
    pub(super) staging: BytesMut,
    pub(super) state: State,
    pub(super) active: Option<Part>,
    pub(super) wrote_first_heading: bool,
    /// Content error held back because bytes were already delivered.
    pub(super) deferred: Option<io::Error>,
    pub(super) random: Box<dyn RandomSource>,
    pub(super) config: EncoderConfig,
    pub(super) scratch: Vec<u8>,
    pub(super) produced: u64,
}

impl Encoder {
    /// Bind `parts` and generate a random boundary from the OS CSPRNG.
    ///
    /// # Errors
    ///
    /// `Random` if the OS refuses to provide randomness.
    pub fn new<S: PartSequence + 'static>(parts: S) -> Result<Self> {
        EncoderBuilder::new().build(parts)
    }

    /// Bind `parts`, drawing boundaries from `random`.
    pub fn with_random<S, R>(parts: S, random: R) -> Result<Self>
    where
        S: PartSequence + 'static,
        R: RandomSource + 'static,
    {
        EncoderBuilder::new().random(random).build(parts)
    }

    /// Start a builder.
    pub fn builder() -> EncoderBuilder {
        EncoderBuilder::new()
    }

    /// Current boundary, or `""` once closed.
    pub fn boundary(&self) -> &str {
        self.boundary.as_ref().map(Boundary::as_str).unwrap_or("")
    }

    /// Replace the boundary.
    ///
    /// Only allowed before the first part has been pulled. On failure the
    /// previous boundary is kept.
    ///
    /// # Errors
    ///
    /// - `ClosedSource` after [`close`](Encoder::close)
    /// - `BoundarySetAfterStreamingStarted` once output has begun
    /// - `InvalidBoundaryLength` / `InvalidBoundaryCharacter`
    pub fn set_boundary(&mut self, boundary: &str) -> Result<()> {
        match self.state {
            State::Closed => return Err(MultipartError::ClosedSource),
            State::Idle => {}
            _ => return Err(MultipartError::BoundarySetAfterStreamingStarted),
        }
        let boundary = Boundary::new(boundary)?;
        tracing::debug!("Boundary overridden ({} bytes)", boundary.len());
        self.boundary = Some(boundary);
        Ok(())
    }

    /// `multipart/form-data; boundary=...` for the current boundary.
    pub fn form_data_content_type(&self) -> String {
        crate::boundary::form_data_content_type(self.boundary())
    }

    /// Stop the sequence, drop buffered state and clear the boundary.
    ///
    /// Every later data-producing call fails with `ClosedSource`. Closing
    /// twice is a no-op.
    pub fn close(&mut self) {
        if self.state == State::Closed {
            return;
        }
        tracing::debug!("Closing encoder in state {:?}", self.state);
        self.pull.stop();
        self.boundary = None;
        self.staging.clear();
        self.active = None;
        self.deferred = None;
        self.state = State::Closed;
    }

    /// Stop the current sequence and re-arm the encoder for `parts`.
    ///
    /// A fresh random boundary is generated, so the encoder can be reused
    /// after [`close`](Encoder::close). If boundary generation fails the
    /// encoder is left untouched.
    pub fn reset<S: PartSequence + 'static>(&mut self, parts: S) -> Result<()> {
        let boundary = Boundary::random(self.random.as_mut())?;
        tracing::debug!("Resetting encoder from state {:?}", self.state);
        self.pull.stop();
        self.pull = Pull::new(parts);
        self.boundary = Some(boundary);
        self.staging.clear();
        self.active = None;
        self.wrote_first_heading = false;
        self.deferred = None;
        self.produced = 0;
        self.state = State::Idle;
        Ok(())
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    /// Total bytes delivered since creation or the last reset.
    #[inline]
    pub fn bytes_produced(&self) -> u64 {
        self.produced
    }

    /// Active configuration.
    #[inline]
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Pull the next item and stage its heading, or the trailer on
    /// exhaustion.
    pub(super) fn advance(&mut self) -> Result<()> {
        let boundary = self.boundary.as_ref().ok_or(MultipartError::ClosedSource)?;
        match self.pull.next() {
            Some(Ok(part)) => {
                write_heading(
                    &mut self.staging,
                    boundary.as_str(),
                    !self.wrote_first_heading,
                    part.header(),
                );
                tracing::trace!(
                    "Pulled part #{} ({} header line(s))",
                    self.pull.pulled(),
                    part.header().line_count()
                );
                self.wrote_first_heading = true;
                self.active = Some(part);
                self.state = State::Heading;
                Ok(())
            }
            Some(Err(e)) => {
                tracing::warn!("Part sequence failed: {}", e);
                Err(e)
            }
            None => {
                write_trailer(&mut self.staging, boundary.as_str(), !self.wrote_first_heading);
                tracing::debug!(
                    "Part sequence exhausted after {} item(s), finalizing",
                    self.pull.pulled()
                );
                self.state = State::Finalizing;
                Ok(())
            }
        }
    }

    /// Copy as much staged data as fits into `buf`.
    fn drain_staging(&mut self, buf: &mut [u8]) -> usize {
        let n = self.staging.len().min(buf.len());
        buf[..n].copy_from_slice(&self.staging[..n]);
        self.staging.advance(n);
        n
    }
}

impl Read for Encoder {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(e) = self.deferred.take() {
            return Err(e);
        }
        if self.state == State::Closed {
            return Err(MultipartError::ClosedSource.into());
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let mut written = 0;
        loop {
            // only reached with nothing delivered yet in this call
            if self.active.is_none() && matches!(self.state, State::Idle | State::Streaming) {
                self.advance()?;
            }

            written += self.drain_staging(&mut buf[written..]);

            match self.state {
                State::Finalizing => {
                    if written == 0 {
                        self.state = State::Done;
                    }
                    break;
                }
                State::Done => break,
                State::Heading | State::Streaming => {
                    if !self.staging.is_empty() || written == buf.len() {
                        break;
                    }
                    self.state = State::Streaming;

                    let content = self.active.as_mut().and_then(Part::content_mut);
                    let result = match content {
                        Some(content) => content.read(&mut buf[written..]),
                        None => Ok(0),
                    };
                    match result {
                        Ok(0) => {
                            self.active = None;
                            if written > 0 {
                                break;
                            }
                        }
                        Ok(n) => {
                            written += n;
                            break;
                        }
                        Err(e) if written > 0 => {
                            tracing::warn!("Content read failed after {} byte(s): {}", written, e);
                            self.deferred = Some(e);
                            break;
                        }
                        Err(e) => {
                            tracing::warn!("Content read failed: {}", e);
                            return Err(e);
                        }
                    }
                }
                State::Idle | State::Closed => {
                    return Err(MultipartError::ClosedSource.into());
                }
            }
        }

        self.produced += written as u64;
        Ok(written)
    }
}

impl fmt::Debug for Encoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encoder")
            .field("boundary", &self.boundary())
            .field("state", &self.state)
            .field("staged", &self.staging.len())
            .field("pulled", &self.pull.pulled())
            .field("produced", &self.produced)
            .finish()
    }
}

/// Builder for [`Encoder`].
pub struct EncoderBuilder {
    boundary: Option<String>,
    random: Option<Box<dyn RandomSource>>,
    config: EncoderConfig,
}

impl EncoderBuilder {
    /// Builder with OS randomness and default configuration.
    pub fn new() -> Self {
        Self {
            boundary: None,
            random: None,
            config: EncoderConfig::default(),
        }
    }

    /// Use a fixed boundary instead of a random one.
    ///
    /// Validated by [`build`](EncoderBuilder::build).
    pub fn boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = Some(boundary.into());
        self
    }

    /// Randomness provider for generated boundaries.
    pub fn random<R: RandomSource + 'static>(mut self, random: R) -> Self {
        self.random = Some(Box::new(random));
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: EncoderConfig) -> Self {
        self.config = config;
        self
    }

    /// Upper bound for the bulk-copy scratch buffer.
    pub fn copy_buffer_size(mut self, size: usize) -> Self {
        self.config.copy_buffer_size = size;
        self
    }

    /// Bind `parts` and build the encoder.
    ///
    /// # Errors
    ///
    /// A boundary validation error, or `Random` when generation fails.
    pub fn build<S: PartSequence + 'static>(self, parts: S) -> Result<Encoder> {
        let mut random = self
            .random
            .unwrap_or_else(|| Box::new(OsRandom) as Box<dyn RandomSource>);
        let boundary = match self.boundary {
            Some(b) => Boundary::new(b)?,
            None => Boundary::random(random.as_mut())?,
        };
        Ok(Encoder {
            boundary: Some(boundary),
            pull: Pull::new(parts),
            staging: BytesMut::with_capacity(STAGING_CAPACITY),
            state: State::Idle,
            active: None,
            wrote_first_heading: false,
            deferred: None,
            random,
            config: self.config,
            scratch: Vec::new(),
            produced: 0,
        })
    }
}

impl Default for EncoderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Stage a part heading: delimiter line, header lines, blank line.
fn write_heading(buf: &mut BytesMut, boundary: &str, first: bool, header: &HeaderMap) {
    buf.clear();
    if !first {
        buf.extend_from_slice(b"\r\n");
    }
    buf.extend_from_slice(b"--");
    buf.extend_from_slice(boundary.as_bytes());
    for (key, values) in header {
        for value in values {
            buf.extend_from_slice(b"\r\n");
            buf.extend_from_slice(key.as_bytes());
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(value.as_bytes());
        }
    }
    buf.extend_from_slice(b"\r\n\r\n");
}

/// Stage the close delimiter.
///
/// With no part written the leading line break is omitted so the body
/// never starts with one.
fn write_trailer(buf: &mut BytesMut, boundary: &str, empty: bool) {
    buf.clear();
    if !empty {
        buf.extend_from_slice(b"\r\n");
    }
    buf.extend_from_slice(b"--");
    buf.extend_from_slice(boundary.as_bytes());
    buf.extend_from_slice(b"--\r\n");
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use proptest::prelude::*;

    use super::testing::FailAfter;
    use super::*;
    use crate::boundary::testing::{CountingRandom, FailingRandom};
    use crate::part::ReaderContent;
    use crate::sequence::pull::testing::Tracked;
    use crate::sequence::{iter_parts, part_seq};

    fn fixed(parts: Vec<Part>, boundary: &str) -> Encoder {
        Encoder::builder()
            .boundary(boundary)
            .build(part_seq(parts))
            .unwrap()
    }

    fn read_in_chunks(encoder: &mut Encoder, chunk: usize) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = vec![0u8; chunk];
        loop {
            let n = encoder.read(&mut buf).unwrap();
            if n == 0 {
                return out;
            }
            out.extend_from_slice(&buf[..n]);
        }
    }

    fn sample_parts() -> Vec<Part> {
        vec![
            Part::new()
                .with_form_name("Field")
                .with_content_string("Hello"),
            Part::new()
                .with_form_name("Attachment")
                .with_file_name("notes.txt")
                .with_content_bytes(&b"line one\nline two\n"[..]),
            Part::new().with_form_name("Empty"),
        ]
    }

    #[test]
    fn test_single_part_exact_bytes() {
        let part = Part::new()
            .with_header("Content-Type", "text/plain")
            .with_content_string("Hi");
        let mut encoder = fixed(vec![part], "b");

        let out = read_in_chunks(&mut encoder, 1024);
        assert_eq!(
            out,
            b"--b\r\nContent-Type: text/plain\r\n\r\nHi\r\n--b--\r\n".to_vec()
        );
        assert_eq!(encoder.state(), State::Done);
        assert_eq!(encoder.bytes_produced(), out.len() as u64);
    }

    #[test]
    fn test_multi_value_headers_in_key_order() {
        let part = Part::new()
            .with_header("X-Tag", "one")
            .with_header("X-Tag", "two")
            .with_header("A-First", "yes");
        let mut encoder = fixed(vec![part], "q");

        let out = read_in_chunks(&mut encoder, 7);
        assert_eq!(
            out,
            b"--q\r\nA-First: yes\r\nX-Tag: one\r\nX-Tag: two\r\n\r\n\r\n--q--\r\n".to_vec()
        );
    }

    #[test]
    fn test_later_parts_start_with_line_break() {
        let parts = vec![
            Part::new().with_content_string("a"),
            Part::new().with_content_string("b"),
        ];
        let mut encoder = fixed(parts, "z");

        let out = read_in_chunks(&mut encoder, 3);
        assert_eq!(out, b"--z\r\n\r\na\r\n--z\r\n\r\nb\r\n--z--\r\n".to_vec());
    }

    #[test]
    fn test_empty_sequence_emits_only_close_delimiter() {
        let mut encoder = fixed(Vec::new(), "e");
        let out = read_in_chunks(&mut encoder, 64);
        assert_eq!(out, b"--e--\r\n".to_vec());
    }

    #[test]
    fn test_parts_without_content_never_yield_premature_eof() {
        let parts = vec![Part::new(), Part::new(), Part::new()];
        let mut encoder = fixed(parts, "x");

        let mut buf = [0u8; 4];
        let mut out = Vec::new();
        loop {
            let n = encoder.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert!(out.ends_with(b"\r\n--x--\r\n"));
        assert_eq!(out.windows(3).filter(|w| w == b"--x").count(), 4);
    }

    #[test]
    fn test_empty_buffer_read_has_no_side_effects() {
        let (seq, _) = Tracked::new(vec![Ok(Part::new())]);
        let mut encoder = Encoder::builder().boundary("b").build(seq).unwrap();

        assert_eq!(encoder.read(&mut []).unwrap(), 0);
        assert_eq!(encoder.state(), State::Idle);
        assert_eq!(encoder.pull.pulled(), 0);
    }

    #[test]
    fn test_done_keeps_returning_eof() {
        let mut encoder = fixed(vec![Part::new()], "b");
        read_in_chunks(&mut encoder, 16);

        let mut buf = [0u8; 8];
        assert_eq!(encoder.read(&mut buf).unwrap(), 0);
        assert_eq!(encoder.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_sequence_error_returned_without_bytes() {
        let (seq, _) = Tracked::new(vec![
            Ok(Part::new().with_content_string("ok")),
            Err(MultipartError::sequence("producer failed")),
        ]);
        let mut encoder = Encoder::builder().boundary("b").build(seq).unwrap();

        let mut buf = [0u8; 256];
        let n = encoder.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"--b\r\n\r\nok");

        let err = encoder.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
        let inner = err
            .get_ref()
            .and_then(|e| e.downcast_ref::<MultipartError>())
            .unwrap();
        assert!(inner.is_sequence());
    }

    #[test]
    fn test_content_error_deferred_after_delivered_bytes() {
        let part = Part::new().with_content(FailAfter::new(b""));
        let mut encoder = fixed(vec![part], "b");

        let mut buf = [0u8; 64];
        let n = encoder.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"--b\r\n\r\n");

        let err = encoder.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_closed_encoder_fails_every_read() {
        let (seq, stops) = Tracked::new(vec![Ok(Part::new()), Ok(Part::new())]);
        let mut encoder = Encoder::builder().boundary("b").build(seq).unwrap();

        let mut buf = [0u8; 4];
        encoder.read(&mut buf).unwrap();
        encoder.close();
        encoder.close();

        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert_eq!(encoder.boundary(), "");
        assert_eq!(encoder.state(), State::Closed);
        let err = encoder.read(&mut buf).unwrap_err();
        assert!(matches!(
            err.get_ref().and_then(|e| e.downcast_ref::<MultipartError>()),
            Some(MultipartError::ClosedSource)
        ));
        assert!(matches!(
            encoder.set_boundary("other"),
            Err(MultipartError::ClosedSource)
        ));
    }

    #[test]
    fn test_set_boundary_only_before_first_pull() {
        let mut encoder = fixed(vec![Part::new()], "first");
        encoder.set_boundary("second").unwrap();
        assert_eq!(encoder.boundary(), "second");

        assert!(matches!(
            encoder.set_boundary("bad boundary "),
            Err(MultipartError::InvalidBoundaryCharacter { ch: ' ', index: 12 })
        ));
        assert_eq!(encoder.boundary(), "second");

        let mut buf = [0u8; 1];
        encoder.read(&mut buf).unwrap();
        assert!(matches!(
            encoder.set_boundary("third"),
            Err(MultipartError::BoundarySetAfterStreamingStarted)
        ));
        assert_eq!(encoder.boundary(), "second");
    }

    #[test]
    fn test_reset_stops_previous_sequence_and_rearms() {
        let (first, stops) = Tracked::new(vec![Ok(Part::new()), Ok(Part::new())]);
        let mut encoder = Encoder::with_random(first, CountingRandom(0)).unwrap();
        let initial = encoder.boundary().to_string();

        let mut buf = [0u8; 8];
        encoder.read(&mut buf).unwrap();
        encoder.close();

        encoder
            .reset(part_seq(vec![Part::new().with_content_string("again")]))
            .unwrap();
        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert_eq!(encoder.state(), State::Idle);
        assert_ne!(encoder.boundary(), initial);
        assert_eq!(encoder.boundary().len(), 60);

        let out = String::from_utf8(read_in_chunks(&mut encoder, 32)).unwrap();
        assert!(out.starts_with(&format!("--{}\r\n", encoder.boundary())));
        assert!(out.contains("\r\n\r\nagain\r\n"));
    }

    #[test]
    fn test_reset_failure_leaves_encoder_untouched() {
        let mut encoder = Encoder::builder()
            .boundary("keep")
            .random(FailingRandom)
            .build(part_seq(vec![Part::new()]))
            .unwrap();

        assert!(matches!(
            encoder.reset(iter_parts(Vec::<Result<Part>>::new())),
            Err(MultipartError::Random(_))
        ));
        assert_eq!(encoder.boundary(), "keep");
        assert_eq!(encoder.state(), State::Idle);
    }

    #[test]
    fn test_new_fails_when_randomness_fails() {
        let result = Encoder::with_random(part_seq(Vec::new()), FailingRandom);
        assert!(matches!(result, Err(MultipartError::Random(_))));
    }

    #[test]
    fn test_builder_rejects_invalid_boundary() {
        let result = Encoder::builder().boundary("").build(part_seq(Vec::new()));
        assert!(matches!(result, Err(MultipartError::InvalidBoundaryLength(0))));
    }

    #[test]
    fn test_form_data_content_type_quotes_when_needed() {
        let mut encoder = fixed(Vec::new(), "simple");
        assert_eq!(
            encoder.form_data_content_type(),
            "multipart/form-data; boundary=simple"
        );
        encoder.set_boundary("with:colon").unwrap();
        assert_eq!(
            encoder.form_data_content_type(),
            "multipart/form-data; boundary=\"with:colon\""
        );
    }

    #[test]
    fn test_dropping_encoder_stops_sequence() {
        let (seq, stops) = Tracked::new(vec![Ok(Part::new())]);
        drop(Encoder::builder().boundary("b").build(seq).unwrap());
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: EncoderConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EncoderConfig::default());

        let config: EncoderConfig = serde_json::from_str(r#"{"copy_buffer_size": 8}"#).unwrap();
        assert_eq!(config.copy_buffer_size, 8);
    }

    proptest! {
        #[test]
        fn prop_output_independent_of_read_size(chunk in 1usize..64) {
            let expected = fixed(sample_parts(), "prop").encode_to_vec().unwrap();

            let mut encoder = fixed(sample_parts(), "prop");
            prop_assert_eq!(read_in_chunks(&mut encoder, chunk), expected);
        }

        #[test]
        fn prop_rejected_boundary_is_not_applied(candidate in "[ -~]{0,80}") {
            let mut encoder = fixed(sample_parts(), "keep");
            match encoder.set_boundary(&candidate) {
                Ok(()) => prop_assert_eq!(encoder.boundary(), candidate.as_str()),
                Err(_) => prop_assert_eq!(encoder.boundary(), "keep"),
            }
        }

        #[test]
        fn prop_reader_content_matches_cursor_content(
            body in proptest::collection::vec(any::<u8>(), 0..300),
            chunk in 1usize..32,
        ) {
            let cursor = fixed(vec![Part::new().with_content_bytes(body.clone())], "c");
            let reader = fixed(
                vec![Part::new().with_content(ReaderContent(io::Cursor::new(body)))],
                "c",
            );
            let (mut a, mut b) = (cursor, reader);
            prop_assert_eq!(read_in_chunks(&mut a, chunk), read_in_chunks(&mut b, chunk));
        }
    }
}
