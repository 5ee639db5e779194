// =============================================================================
// Blocking Queue — unbounded FIFO with a cooperative stop signal
// =============================================================================
//
// One `parking_lot::Mutex` serialises every producer and consumer, so items
// come out in exactly the order they went in regardless of which thread
// pushed them.  Consumers either block (`pop`) or poll (`try_pop`).
//
// Stopping the queue wakes every blocked consumer.  A stopped queue still
// accepts pushes and still hands out queued items; `pop` only reports
// `QueueClosed` once the queue is both stopped and empty.
// =============================================================================

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

/// Returned by [`BlockingQueue::pop`] when the queue was stopped while empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueClosed;

impl std::fmt::Display for QueueClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "queue closed")
    }
}

impl std::error::Error for QueueClosed {}

struct Inner<T> {
    items: VecDeque<T>,
    stopped: bool,
}

pub struct BlockingQueue<T> {
    inner: Mutex<Inner<T>>,
    ready: Condvar,
}

impl<T> BlockingQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                stopped: false,
            }),
            ready: Condvar::new(),
        }
    }

    /// Append to the tail and wake one waiting consumer.  Never blocks.
    pub fn push(&self, item: T) {
        let mut inner = self.inner.lock();
        inner.items.push_back(item);
        self.ready.notify_one();
    }

    /// Block until an item is available or the queue is stopped.
    pub fn pop(&self) -> Result<T, QueueClosed> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(item) = inner.items.pop_front() {
                return Ok(item);
            }
            if inner.stopped {
                return Err(QueueClosed);
            }
            self.ready.wait(&mut inner);
        }
    }

    /// Take the head item if there is one.  Ignores the stop flag.
    pub fn try_pop(&self) -> Option<T> {
        self.inner.lock().items.pop_front()
    }

    /// Mark the queue closed and wake every blocked consumer.  Idempotent.
    pub fn stop(&self) {
        let mut inner = self.inner.lock();
        inner.stopped = true;
        self.ready.notify_all();
    }

    /// Clear the stop flag so blocking consumers wait again.  Queued items are
    /// kept.
    pub fn reset(&self) {
        self.inner.lock().stopped = false;
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.lock().stopped
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
