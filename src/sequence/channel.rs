//! Channel-backed part sequence for push-style producers.
//!
//! Producers hand parts to a [`PartSender`] (async or from a plain thread);
//! the encoder pulls them through the matching [`PartReceiver`]. Stopping the
//! receiver closes the channel, which producers observe as
//! `MultipartError::SequenceStopped` or through [`PartSender::closed`].
//!
//! ```text
//! Producer task ─► PartSender ─► mpsc (bounded) ─► PartReceiver ─► Encoder
//! ```
//!
//! The receiver blocks while waiting for the next part, so the encoder must
//! run on a thread that may block (a plain thread or
//! `tokio::task::spawn_blocking`), never directly inside an async task.

use tokio::sync::mpsc;

use super::PartSequence;
use crate::error::{BoxError, MultipartError, Result};
use crate::part::Part;

/// Default channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1;

/// Create a bounded part channel.
///
/// A capacity of 0 is treated as 1. Small capacities keep at most a few
/// parts (and their open content streams) alive ahead of the encoder.
pub fn part_channel(capacity: usize) -> (PartSender, PartReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (PartSender { tx }, PartReceiver { rx })
}

/// Producing half of a part channel.
///
/// This is cheaply cloneable; the sequence ends when every sender is dropped.
#[derive(Clone)]
pub struct PartSender {
    tx: mpsc::Sender<Result<Part>>,
}

impl PartSender {
    /// Send a part, waiting for channel capacity.
    pub async fn send(&self, part: Part) -> Result<()> {
        self.tx
            .send(Ok(part))
            .await
            .map_err(|_| MultipartError::SequenceStopped)
    }

    /// Abort the sequence with `err`.
    pub async fn fail<E: Into<BoxError>>(&self, err: E) -> Result<()> {
        self.tx
            .send(Err(MultipartError::sequence(err)))
            .await
            .map_err(|_| MultipartError::SequenceStopped)
    }

    /// Send a part from synchronous code.
    ///
    /// Must not be called from within an async runtime.
    pub fn blocking_send(&self, part: Part) -> Result<()> {
        self.tx
            .blocking_send(Ok(part))
            .map_err(|_| MultipartError::SequenceStopped)
    }

    /// Abort the sequence with `err` from synchronous code.
    pub fn blocking_fail<E: Into<BoxError>>(&self, err: E) -> Result<()> {
        self.tx
            .blocking_send(Err(MultipartError::sequence(err)))
            .map_err(|_| MultipartError::SequenceStopped)
    }

    /// Check whether the consumer stopped or went away.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Wait until the consumer stops or goes away.
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}

/// Consuming half of a part channel.
pub struct PartReceiver {
    rx: mpsc::Receiver<Result<Part>>,
}

impl PartSequence for PartReceiver {
    fn next_part(&mut self) -> Option<Result<Part>> {
        self.rx.blocking_recv()
    }

    fn stop(&mut self) {
        self.rx.close();
        // release parts already queued so their content streams close now
        let mut dropped = 0usize;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            tracing::debug!("Dropped {} queued part(s) on stop", dropped);
        }
    }
}
