//! Bounded queues that drop new items instead of blocking.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use crossbeam::channel::{self, TrySendError};

/// Creates a queue that holds at most `capacity` items.
///
/// When the queue is full, [`QueueSender::push`] discards the item it was given and returns
/// immediately. Items that are already queued are kept, so the consumer always sees them in the
/// order they were pushed.
///
/// This is a drop-newest policy: while the queue is full, newer items are discarded and the older
/// ones are still delivered. With small capacities the consumer lags by at most `capacity` items.
///
/// # Panics
///
/// Panics if `capacity` is 0.
pub fn queue<T>(capacity: usize) -> (QueueSender<T>, QueueReceiver<T>) {
    assert!(capacity > 0, "queue capacity must be at least 1");
    let (sender, recv) = channel::bounded(capacity);
    let dropped = Arc::new(AtomicU64::new(0));
    (
        QueueSender {
            inner: sender,
            dropped: dropped.clone(),
        },
        QueueReceiver {
            inner: recv,
            dropped,
        },
    )
}

/// Outcome of [`QueueSender::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Push {
    /// The item was added to the queue.
    Queued,
    /// The queue was full and the item was discarded.
    Dropped,
    /// The [`QueueReceiver`] no longer exists.
    Disconnected,
}

/// The producing half of a [`queue`].
pub struct QueueSender<T> {
    inner: channel::Sender<T>,
    dropped: Arc<AtomicU64>,
}

impl<T> QueueSender<T> {
    /// Adds `value` to the queue if there is room for it. Never blocks.
    pub fn push(&self, value: T) -> Push {
        match self.inner.try_send(value) {
            Ok(()) => Push::Queued,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Push::Dropped
            }
            Err(TrySendError::Disconnected(_)) => Push::Disconnected,
        }
    }
}

/// The consuming half of a [`queue`].
pub struct QueueReceiver<T> {
    inner: channel::Receiver<T>,
    dropped: Arc<AtomicU64>,
}

impl<T> QueueReceiver<T> {
    /// Removes the oldest item from the queue, if there is one. Never blocks.
    pub fn pop(&self) -> Option<T> {
        self.inner.try_recv().ok()
    }

    /// Returns the number of items currently queued.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the maximum number of items the queue holds.
    pub fn capacity(&self) -> usize {
        self.inner.capacity().unwrap_or(0)
    }

    /// Returns how many items the sender has discarded because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
