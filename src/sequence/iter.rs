//! Iterator-backed part sequences.

use super::PartSequence;
use crate::error::Result;
use crate::part::Part;

/// Part sequence over an iterator; `stop` drops the iterator.
pub struct IterParts<I> {
    iter: Option<I>,
}

impl<I> IterParts<I> {
    /// Wrap an iterator.
    pub fn new(iter: I) -> Self {
        Self { iter: Some(iter) }
    }
}

impl<I> PartSequence for IterParts<I>
where
    I: Iterator<Item = Result<Part>> + Send,
{
    fn next_part(&mut self) -> Option<Result<Part>> {
        self.iter.as_mut()?.next()
    }

    fn stop(&mut self) {
        self.iter = None;
    }
}

/// Sequence over fallible items, e.g. a lazy generator.
///
/// # Example
///
/// ```
/// use partstream::part::Part;
/// use partstream::sequence::{iter_parts, PartSequence};
///
/// let mut seq = iter_parts((0..3).map(|i| Ok(Part::new().with_form_name(&format!("f{i}")))));
/// assert_eq!(seq.next_part().unwrap().unwrap().form_name().as_deref(), Some("f0"));
/// ```
pub fn iter_parts<I>(items: I) -> IterParts<I::IntoIter>
where
    I: IntoIterator<Item = Result<Part>>,
    I::IntoIter: Send,
{
    IterParts::new(items.into_iter())
}

/// Sequence over infallible parts.
pub fn part_seq<I>(parts: I) -> IterParts<impl Iterator<Item = Result<Part>> + Send>
where
    I: IntoIterator<Item = Part>,
    I::IntoIter: Send,
{
    IterParts::new(parts.into_iter().map(Ok))
}
