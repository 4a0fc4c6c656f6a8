//! Pull adapter around a part sequence.

use super::PartSequence;
use crate::error::Result;
use crate::part::Part;

/// One-at-a-time puller with an explicit cancellation hook.
///
/// After the sequence reports exhaustion, or after [`stop`](Pull::stop), the
/// sequence is dropped and every further pull returns `None`. Dropping an
/// unfinished `Pull` stops the sequence.
pub struct Pull {
    seq: Option<Box<dyn PartSequence>>,
    pulled: u64,
}

impl Pull {
    /// Wrap a sequence.
    pub fn new<S: PartSequence + 'static>(seq: S) -> Self {
        Self::from_boxed(Box::new(seq))
    }

    /// Wrap an already boxed sequence.
    pub fn from_boxed(seq: Box<dyn PartSequence>) -> Self {
        Self {
            seq: Some(seq),
            pulled: 0,
        }
    }

    /// Cancel the sequence if it is still live.
    ///
    /// The sequence's `stop` hook runs at most once.
    pub fn stop(&mut self) {
        if let Some(mut seq) = self.seq.take() {
            tracing::debug!("Stopping part sequence after {} item(s)", self.pulled);
            seq.stop();
        }
    }

    /// True once the sequence was exhausted or stopped.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.seq.is_none()
    }

    /// Number of items (parts or errors) pulled so far.
    #[inline]
    pub fn pulled(&self) -> u64 {
        self.pulled
    }
}

impl Iterator for Pull {
    type Item = Result<Part>;

    fn next(&mut self) -> Option<Self::Item> {
        let seq = self.seq.as_mut()?;
        match seq.next_part() {
            Some(item) => {
                self.pulled += 1;
                Some(item)
            }
            None => {
                self.seq = None;
                None
            }
        }
    }
}

impl Drop for Pull {
    fn drop(&mut self) {
        self.stop();
    }
}
