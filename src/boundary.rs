//! Boundary management.
//!
//! A boundary is either generated from [`RANDOM_BOUNDARY_BYTES`] bytes of
//! secure randomness (hex-encoded, so 60 lowercase characters) or supplied by
//! the caller and validated against the RFC 2046 `bchars` grammar:
//!
//! ```text
//! boundary := 0*69<bchars> bcharsnospace
//! bchars   := bcharsnospace / " "
//! bcharsnospace := DIGIT / ALPHA / "'" / "(" / ")" / "+" / "_"
//!                  / "," / "-" / "." / "/" / ":" / "=" / "?"
//! ```
//!
//! Randomness is injected through [`RandomSource`] so boundary generation can
//! be made deterministic in tests.

use std::fmt;

use crate::error::{MultipartError, Result};
use crate::header::{format_media_type, MediaParams};

/// Number of random bytes behind a generated boundary.
pub const RANDOM_BOUNDARY_BYTES: usize = 30;

/// Maximum boundary length in bytes.
pub const MAX_BOUNDARY_LEN: usize = 70;

/// Media type emitted by [`Boundary::form_data_content_type`].
pub const FORM_DATA_MEDIA_TYPE: &str = "multipart/form-data";

/// Source of random bytes for boundary generation.
pub trait RandomSource: Send {
    /// Fill `dest` entirely with random bytes.
    fn fill_bytes(&mut self, dest: &mut [u8]) -> Result<()>;
}

/// Operating-system CSPRNG (via `getrandom`).
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill_bytes(&mut self, dest: &mut [u8]) -> Result<()> {
        getrandom::getrandom(dest)?;
        Ok(())
    }
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn fill_bytes(&mut self, dest: &mut [u8]) -> Result<()> {
        (**self).fill_bytes(dest)
    }
}

/// A validated multipart boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Boundary(String);

impl Boundary {
    /// Validate and wrap a caller-supplied boundary.
    ///
    /// # Errors
    ///
    /// `InvalidBoundaryLength` or `InvalidBoundaryCharacter`.
    pub fn new(boundary: impl Into<String>) -> Result<Self> {
        let boundary = boundary.into();
        validate_boundary(&boundary)?;
        Ok(Self(boundary))
    }

    /// Generate a random boundary from `rng`.
    ///
    /// # Example
    ///
    /// ```
    /// use partstream::boundary::{Boundary, OsRandom};
    ///
    /// let boundary = Boundary::random(&mut OsRandom).unwrap();
    /// assert_eq!(boundary.as_str().len(), 60);
    /// ```
    pub fn random(rng: &mut dyn RandomSource) -> Result<Self> {
        let mut raw = [0u8; RANDOM_BOUNDARY_BYTES];
        rng.fill_bytes(&mut raw)?;
        Ok(Self(hex::encode(raw)))
    }

    /// Boundary text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Boundary length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a validated boundary.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `multipart/form-data; boundary=...`, quoting the boundary if needed.
    pub fn form_data_content_type(&self) -> String {
        form_data_content_type(&self.0)
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Boundary {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Format the `multipart/form-data` content type for `boundary`.
pub(crate) fn form_data_content_type(boundary: &str) -> String {
    let mut params = MediaParams::new();
    params.insert("boundary".to_string(), boundary.to_string());
    // type and parameter name are constant tokens
    format_media_type(FORM_DATA_MEDIA_TYPE, &params)
        .unwrap_or_else(|| FORM_DATA_MEDIA_TYPE.to_string())
}

/// Check a candidate boundary against the RFC 2046 rules.
///
/// Nothing is modified on failure; the error names the first violation.
pub fn validate_boundary(boundary: &str) -> Result<()> {
    let len = boundary.len();
    if len == 0 || len > MAX_BOUNDARY_LEN {
        return Err(MultipartError::InvalidBoundaryLength(len));
    }

    let end = len - 1;
    for (index, ch) in boundary.char_indices() {
        if is_bchar_nospace(ch) || (ch == ' ' && index != end) {
            continue;
        }
        return Err(MultipartError::InvalidBoundaryCharacter { ch, index });
    }
    Ok(())
}

fn is_bchar_nospace(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
        || matches!(
            ch,
            '\'' | '(' | ')' | '+' | '_' | ',' | '-' | '.' | '/' | ':' | '=' | '?'
        )
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Deterministic source: byte `i` of every fill is `seed + i`.
    #[derive(Debug, Clone, Copy)]
    pub struct CountingRandom(pub u8);

    impl RandomSource for CountingRandom {
        fn fill_bytes(&mut self, dest: &mut [u8]) -> Result<()> {
            for (i, b) in dest.iter_mut().enumerate() {
                *b = self.0.wrapping_add(i as u8);
            }
            self.0 = self.0.wrapping_add(1);
            Ok(())
        }
    }

    /// Source that always fails.
    pub struct FailingRandom;

    impl RandomSource for FailingRandom {
        fn fill_bytes(&mut self, _dest: &mut [u8]) -> Result<()> {
            Err(MultipartError::Random(getrandom::Error::UNSUPPORTED))
        }
    }
}
