//! Thread-safe FIFO with timeout-bounded dequeue.
//!
//! The implementation under test posts observable actions from its own
//! threads through an [`Observer`]; the driver drains them with
//! [`TimedQueue::try_dequeue`]. This queue is the only structure shared
//! between the driver and the implementation.

use crate::action::Action;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

/// A cloneable handle to a FIFO queue whose dequeue blocks up to a timeout.
///
/// Clones share the same underlying queue.
pub struct TimedQueue<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    items: Mutex<VecDeque<T>>,
    available: Condvar,
}

/// Queue of implementation-originated observations.
pub type ObservationQueue = TimedQueue<Action>;

impl<T> Clone for TimedQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for TimedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimedQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                items: Mutex::new(VecDeque::new()),
                available: Condvar::new(),
            }),
        }
    }

    /// Append an item to the tail. Never blocks on a consumer.
    pub fn enqueue(&self, item: T) {
        self.inner.items.lock().push_back(item);
        self.inner.available.notify_one();
    }

    /// Remove the head item, waiting at most `timeout` for one to arrive.
    ///
    /// Returns immediately if an item is already queued, and `None` once
    /// `timeout` has elapsed with the queue still empty.
    pub fn try_dequeue(&self, timeout: Duration) -> Option<T> {
        let mut items = self.inner.items.lock();
        if let Some(item) = items.pop_front() {
            return Some(item);
        }

        // A timeout too large to represent as an Instant waits indefinitely.
        let deadline = Instant::now().checked_add(timeout);

        loop {
            match deadline {
                Some(deadline) => {
                    if self
                        .inner
                        .available
                        .wait_until(&mut items, deadline)
                        .timed_out()
                    {
                        return items.pop_front();
                    }
                }
                None => self.inner.available.wait(&mut items),
            }

            // Spurious wakeups and lost races with other consumers loop back.
            if let Some(item) = items.pop_front() {
                return Some(item);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.items.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.items.lock().len()
    }

    /// Discard every queued item.
    pub fn clear(&self) {
        self.inner.items.lock().clear();
    }
}

impl ObservationQueue {
    /// A handle the implementation uses to report observable actions.
    pub fn observer(&self) -> Observer {
        Observer {
            queue: self.clone(),
        }
    }
}

/// Callback handle through which an asynchronous implementation reports
/// observable actions. Safe to clone and use from any thread.
#[derive(Clone)]
pub struct Observer {
    queue: ObservationQueue,
}

impl Observer {
    /// Report an observable action to the driver.
    pub fn observe(&self, action: Action) {
        trace!(action = %action, "Observation posted");
        self.queue.enqueue(action);
    }
}

impl std::fmt::Debug for Observer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observer")
            .field("queued", &self.queue.len())
            .finish()
    }
}
