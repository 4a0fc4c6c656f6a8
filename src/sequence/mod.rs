//! Sequence module - pull-based part sources.
//!
//! The encoder consumes parts strictly one at a time through [`Pull`],
//! which wraps any [`PartSequence`]:
//!
//! ```text
//! Encoder ──next()──► Pull ──next_part()──► PartSequence
//!         ◄─Part/err──     ◄──────────────
//!         ──stop()───►     ──stop()───────► (release resources)
//! ```
//!
//! Provided sequences:
//!
//! - [`part_seq`] / [`iter_parts`]: any in-memory or lazy iterator
//! - [`part_channel`]: push-style producers (threads or async tasks) feeding
//!   a bounded channel
//! - [`PartReader`](crate::decoder::PartReader): parts decoded from an
//!   incoming multipart body

mod channel;
mod iter;
pub(crate) mod pull;

pub use channel::{part_channel, PartReceiver, PartSender, DEFAULT_CHANNEL_CAPACITY};
pub use iter::{iter_parts, part_seq, IterParts};
pub use pull::Pull;

use crate::error::Result;
use crate::part::Part;

/// A forward-only, lazily evaluated source of parts.
///
/// `next_part` returns `None` once the sequence is exhausted. An `Err` item
/// aborts the encoding that consumes it. `stop` is called at most once when
/// the consumer gives up before exhaustion; implementations release any
/// held resources there.
pub trait PartSequence: Send {
    /// Produce the next part.
    fn next_part(&mut self) -> Option<Result<Part>>;

    /// Cancel the sequence.
    fn stop(&mut self) {}
}

impl<S: PartSequence + ?Sized> PartSequence for Box<S> {
    fn next_part(&mut self) -> Option<Result<Part>> {
        (**self).next_part()
    }

    fn stop(&mut self) {
        (**self).stop()
    }
}
