//! Multipart decoder.
//!
//! - [`PartBuffer`]: push-style incremental parser
//! - [`PartReader`]: pull-style [`PartSequence`](crate::sequence::PartSequence)
//!   over any [`std::io::Read`]
//! - [`parse_boundary`]: boundary extraction from a `Content-Type` value

mod part_buffer;
mod reader;

pub use part_buffer::{
    BodyRead, DecodedPart, PartBuffer, DEFAULT_MAX_HEADER_BYTES, DEFAULT_MAX_PART_BYTES,
};
pub use reader::{parts_from_reader, DecoderConfig, PartReader, DEFAULT_READ_CHUNK_SIZE};

use crate::error::{MultipartError, Result};
use crate::header::parse_media_type;

/// Extract the boundary from a `multipart/*` content type.
///
/// ```
/// use partstream::decoder::parse_boundary;
///
/// let boundary = parse_boundary("multipart/form-data; boundary=\"a b\"").unwrap();
/// assert_eq!(boundary, "a b");
/// ```
pub fn parse_boundary(content_type: &str) -> Result<String> {
    let (media_type, mut params) = parse_media_type(content_type)?;
    if !media_type.starts_with("multipart/") {
        return Err(MultipartError::MediaType(format!(
            "expected a multipart media type, got {media_type:?}"
        )));
    }
    match params.remove("boundary") {
        Some(boundary) if !boundary.is_empty() => Ok(boundary),
        _ => Err(MultipartError::MediaType("missing boundary parameter".to_string())),
    }
}
