//! Bounded hand-off queues that shed load instead of blocking producers.
//!
//! Every inter-task queue in the receiver is fixed-capacity with a single
//! non-blocking push on the producer side: when a consumer falls behind the
//! newest item is discarded and the event logged. This bounds memory under
//! sustained overload at the cost of losing data, keeping the read and
//! accept loops live. Consumers use the ordinary blocking `recv` so they do
//! not busy-wait.

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

/// Create a bounded drop-on-full channel.
///
/// `label` names the queue in discard logs.
///
/// # Panics
///
/// Panics if `capacity` is zero, as the underlying channel does.
#[must_use]
pub fn channel<T>(capacity: usize, label: &'static str) -> (LossySender<T>, mpsc::Receiver<T>) {
    let (tx, rx) = mpsc::channel(capacity);
    (LossySender { tx, label }, rx)
}

/// Producer half of a drop-on-full channel.
///
/// Clones share the same queue. The queue closes, signalling end-of-stream
/// to the consumer, once every clone has been dropped.
#[derive(Clone, Debug)]
pub struct LossySender<T> {
    tx: mpsc::Sender<T>,
    label: &'static str,
}

impl<T> LossySender<T> {
    /// Push `item` without blocking; returns whether it was enqueued.
    ///
    /// A full queue drops the item with a warning. A closed queue drops it
    /// quietly; the consumer is already gone and the producer is expected
    /// to notice through its own termination path.
    pub fn try_push(&self, item: T) -> bool {
        match self.tx.try_send(item) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(queue = self.label, "queue full; discarding");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(queue = self.label, "queue closed; discarding");
                false
            }
        }
    }
}
