//! # partstream
//!
//! Streaming `multipart/form-data` encoder.
//!
//! Parts are pulled lazily, one at a time, from a [`PartSequence`] and
//! encoded on demand, so arbitrarily large bodies can be produced with a
//! fixed amount of memory.
//!
//! ## Architecture
//!
//! - **Encoder**: state machine implementing [`std::io::Read`], plus a bulk
//!   [`Encoder::write_to`] path using content/sink fast-path capabilities
//! - **Part**: headers, content stream and lazily parsed disposition
//! - **Sequence**: pull adapter with a cancellation hook; iterator and
//!   channel-backed sources
//! - **Decoder**: incremental parser yielding parts, for round trips and
//!   re-framing
//!
//! ## Example
//!
//! ```
//! use std::io::Read;
//! use partstream::{part_seq, Encoder, Part};
//!
//! let parts = part_seq(vec![
//!     Part::new().with_form_name("title").with_content_string("Report"),
//!     Part::new()
//!         .with_form_name("file")
//!         .with_file_name("data.csv")
//!         .with_content_type_by_extension()
//!         .with_content_bytes(&b"a,b\n1,2\n"[..]),
//! ]);
//!
//! let mut encoder = Encoder::new(parts).unwrap();
//! let content_type = encoder.form_data_content_type();
//! assert!(content_type.starts_with("multipart/form-data; boundary="));
//!
//! let mut body = Vec::new();
//! encoder.read_to_end(&mut body).unwrap();
//! ```

pub mod boundary;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod header;
pub mod part;
pub mod sequence;

pub use boundary::{Boundary, OsRandom, RandomSource};
pub use decoder::{parse_boundary, parts_from_reader, PartReader};
pub use encoder::{Encoder, EncoderBuilder, EncoderConfig};
pub use error::{CopyError, MultipartError, Result};
pub use header::HeaderMap;
pub use part::{Content, Part, Sink};
pub use sequence::{iter_parts, part_channel, part_seq, PartSequence, Pull};
