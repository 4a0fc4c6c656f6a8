//! Part module - one logical section of a multipart message.
//!
//! - [`Part`]: headers, content stream and a lazily parsed
//!   `Content-Disposition`
//! - [`Content`] / [`Sink`]: byte streams with optional fast-path
//!   capabilities used by the encoder's bulk copy
//! - [`detect_content_type`]: leading-bytes classification
//! - [`TypeRegistry`]: extension to media type lookup

mod content;
mod entity;
mod registry;
mod sniff;

pub use content::{Content, PlainSink, Prefixed, ReaderContent, Sink};
pub use entity::Part;
pub use registry::{add_extension_type, type_by_extension, TypeRegistry};
pub use sniff::{detect_content_type, SNIFF_LEN};

/// Disposition type written by the form name / file name setters.
pub const FORM_DATA_DISPOSITION: &str = "form-data";

/// Content type defaulted for file parts and unknown content.
pub const OCTET_STREAM: &str = "application/octet-stream";
