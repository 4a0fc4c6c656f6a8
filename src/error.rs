//! Error types for partstream.

use std::io;

use thiserror::Error;

/// Boxed error produced by a part sequence.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for all partstream operations.
#[derive(Debug, Error)]
pub enum MultipartError {
    /// The encoder was closed; no further operation is possible.
    #[error("source is closed")]
    ClosedSource,

    /// Boundary is empty or longer than 70 bytes.
    #[error("invalid boundary length: {0} (must be 1..=70 bytes)")]
    InvalidBoundaryLength(usize),

    /// Boundary contains a character outside the RFC 2046 `bchars` set.
    #[error("invalid boundary character {ch:?} at byte {index}")]
    InvalidBoundaryCharacter {
        /// Offending character.
        ch: char,
        /// Byte offset of the character.
        index: usize,
    },

    /// Boundary override attempted after the first part was pulled.
    #[error("boundary cannot be changed after streaming started")]
    BoundarySetAfterStreamingStarted,

    /// Error yielded by the part sequence, passed through untouched.
    #[error("part sequence error: {0}")]
    Sequence(#[source] BoxError),

    /// I/O error while reading part content or writing to a sink.
    #[error("content I/O error: {0}")]
    ContentIo(#[from] io::Error),

    /// The OS randomness source failed.
    #[error("random source error: {0}")]
    Random(#[from] getrandom::Error),

    /// The consuming side of a part channel went away.
    #[error("part sequence stopped")]
    SequenceStopped,

    /// Media type value could not be parsed.
    #[error("media type error: {0}")]
    MediaType(String),

    /// Incoming multipart body is malformed.
    #[error("malformed multipart body: {0}")]
    Malformed(String),

    /// Incoming multipart body exceeds a configured limit.
    #[error("{what} exceeds limit of {limit} bytes")]
    LimitExceeded {
        /// Which limit was hit.
        what: &'static str,
        /// Configured limit.
        limit: usize,
    },
}

impl MultipartError {
    /// Wrap an arbitrary producer error as a sequence error.
    pub fn sequence<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        MultipartError::Sequence(err.into())
    }

    /// Returns true for errors coming from the part sequence itself.
    pub fn is_sequence(&self) -> bool {
        matches!(
            self,
            MultipartError::Sequence(_) | MultipartError::SequenceStopped
        )
    }
}

impl From<MultipartError> for io::Error {
    fn from(err: MultipartError) -> Self {
        match err {
            MultipartError::ContentIo(e) => e,
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}

/// Bulk copy failure, with the bytes written before it.
#[derive(Debug, Error)]
#[error("{error} (after {written} byte(s))")]
pub struct CopyError {
    /// Bytes accepted by the sink during the failed call.
    pub written: u64,
    /// First error encountered.
    #[source]
    pub error: MultipartError,
}

impl From<CopyError> for MultipartError {
    fn from(err: CopyError) -> Self {
        err.error
    }
}

impl From<CopyError> for io::Error {
    fn from(err: CopyError) -> Self {
        err.error.into()
    }
}

/// Result type alias using MultipartError.
pub type Result<T> = std::result::Result<T, MultipartError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_io_unwraps_to_original_error() {
        let original = io::Error::new(io::ErrorKind::BrokenPipe, "pipe gone");
        let err: io::Error = MultipartError::ContentIo(original).into();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(err.to_string(), "pipe gone");
    }

    #[test]
    fn test_sequence_error_is_recoverable_from_io_error() {
        let err: io::Error = MultipartError::sequence("producer failed").into();
        assert_eq!(err.kind(), io::ErrorKind::Other);

        let inner = err.into_inner().unwrap();
        let inner = inner.downcast::<MultipartError>().unwrap();
        assert!(inner.is_sequence());
        assert!(inner.to_string().contains("producer failed"));
    }

    #[test]
    fn test_copy_error_keeps_count_and_cause() {
        let err = CopyError {
            written: 12,
            error: MultipartError::ClosedSource,
        };
        assert!(err.to_string().contains("12 byte(s)"));
        assert!(matches!(MultipartError::from(err), MultipartError::ClosedSource));
    }

    #[test]
    fn test_boundary_error_messages() {
        let err = MultipartError::InvalidBoundaryCharacter { ch: '!', index: 3 };
        assert!(err.to_string().contains("'!'"));
        assert!(err.to_string().contains("byte 3"));

        let err = MultipartError::InvalidBoundaryLength(71);
        assert!(err.to_string().contains("71"));
    }
}
