//! FIFO hand-off between pipeline stages.
//!
//! [`BufferQueue`] carries decoded frames, filtered frames and encoded
//! packets from one stage to the next. It owns payloads only while they are
//! queued: [`pop`](BufferQueue::pop) moves a payload out to the caller, after
//! which the queue has no further claim on it. The queue never decides how a
//! payload is released; the owning stage does, either by dropping what it
//! pops or by passing a release routine to
//! [`drain_with`](BufferQueue::drain_with) at teardown.

use std::collections::VecDeque;

/// An unbounded first-in, first-out queue of owned payloads.
///
/// # Example
///
/// ```
/// use keyshot::BufferQueue;
///
/// let mut queue = BufferQueue::new();
/// queue.push("first");
/// queue.push("second");
/// assert_eq!(queue.len(), 2);
/// assert_eq!(queue.pop(), Some("first"));
/// assert_eq!(queue.pop(), Some("second"));
/// assert_eq!(queue.pop(), None);
/// assert!(queue.is_empty());
/// ```
#[derive(Debug)]
pub struct BufferQueue<T> {
    items: VecDeque<T>,
}

impl<T> Default for BufferQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BufferQueue<T> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    /// Append a payload at the back of the queue.
    pub fn push(&mut self, payload: T) {
        self.items.push_back(payload);
    }

    /// Remove the oldest payload and hand its ownership to the caller.
    ///
    /// Returns `None` when the queue is empty.
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// Borrow the oldest payload without removing it.
    pub fn peek(&self) -> Option<&T> {
        self.items.front()
    }

    /// Number of payloads currently queued.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` when no payload is queued.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Pop every remaining payload, oldest first, and pass each to `release`.
    ///
    /// Returns the number of payloads released. Payloads popped earlier are
    /// not touched.
    pub fn drain_with<F>(&mut self, mut release: F) -> usize
    where
        F: FnMut(T),
    {
        let mut released = 0;
        while let Some(payload) = self.pop() {
            release(payload);
            released += 1;
        }
        released
    }
}
