//! Streaming multipart/form-data encoder.
//!
//! [`Encoder`] pulls parts one at a time from a
//! [`PartSequence`](crate::sequence::PartSequence) and produces the encoded
//! message either through [`std::io::Read`] or through the bulk
//! [`Encoder::write_to`] path.
//!
//! # Wire layout
//!
//! ```text
//! --B\r\nKey: value\r\n...\r\n\r\n<content>      (first part)
//! \r\n--B\r\nKey: value\r\n...\r\n\r\n<content>  (every later part)
//! \r\n--B--\r\n                                 (trailer)
//! ```
//!
//! Header keys are written in ascending order, every value of a key on its
//! own line.

mod copy;
mod source;

pub use source::{Encoder, EncoderBuilder, EncoderConfig, State, DEFAULT_COPY_BUFFER_SIZE};
