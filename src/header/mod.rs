//! Header module - part header map and media-type values.
//!
//! - [`HeaderMap`]: case-insensitive, ordered, multi-valued header storage
//! - [`format_media_type`] / [`parse_media_type`]: `type; key=value` values
//!   such as `Content-Type` and `Content-Disposition`

mod map;
mod media_type;

pub use map::{canonical_key, HeaderMap};
pub use media_type::{format_media_type, is_token, parse_media_type, MediaParams};

/// `Content-Disposition` header name.
pub const CONTENT_DISPOSITION: &str = "Content-Disposition";

/// `Content-Type` header name.
pub const CONTENT_TYPE: &str = "Content-Type";
