//! Backlog: the thread-safe buffer of pending items a dispatcher drains.
//!
//! A [`Backlog`] is a shared handle. Cloning it and passing the clone into a
//! second dispatcher's options makes both dispatchers drain the same items,
//! each item going to exactly one of them.

use crate::signal::{Signal, Watchers};
use crossbeam_deque::{Injector, Steal};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Storage order for a backlog.
///
/// `push` must never block or fail, and `pop` must hand each item to
/// exactly one caller.
pub trait Queue<T>: Send + Sync {
    fn push(&self, item: T);

    fn pop(&self) -> Option<T>;

    /// Advisory count; may be stale by the time it is read.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// First-in-first-out queue. Lock-free.
pub struct Fifo<T> {
    items: Injector<T>,
}

impl<T> Fifo<T> {
    pub fn new() -> Self {
        Self {
            items: Injector::new(),
        }
    }
}

impl<T> Default for Fifo<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> Queue<T> for Fifo<T> {
    fn push(&self, item: T) {
        self.items.push(item);
    }

    fn pop(&self) -> Option<T> {
        loop {
            match self.items.steal() {
                Steal::Success(item) => return Some(item),
                Steal::Empty => return None,
                Steal::Retry => std::hint::spin_loop(),
            }
        }
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Last-in-first-out queue, for depth-first traversals.
pub struct Lifo<T> {
    items: Mutex<Vec<T>>,
}

impl<T> Lifo<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }
}

impl<T> Default for Lifo<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> Queue<T> for Lifo<T> {
    fn push(&self, item: T) {
        self.items.lock().push(item);
    }

    fn pop(&self) -> Option<T> {
        self.items.lock().pop()
    }

    fn len(&self) -> usize {
        self.items.lock().len()
    }
}

/// Shared pending-item buffer. Clones refer to the same items.
pub struct Backlog<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    queue: Box<dyn Queue<T>>,
    watchers: Watchers,
}

impl<T: Send + 'static> Backlog<T> {
    /// A fresh FIFO backlog.
    pub fn new() -> Self {
        Self::with_queue(Fifo::new())
    }

    /// A fresh LIFO backlog.
    pub fn lifo() -> Self {
        Self::with_queue(Lifo::new())
    }

    pub fn with_queue(queue: impl Queue<T> + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                queue: Box::new(queue),
                watchers: Watchers::default(),
            }),
        }
    }
}

impl<T> Backlog<T> {
    /// Insert an item and wake every dispatcher bound to this backlog.
    pub fn push(&self, item: T) {
        self.inner.queue.push(item);
        self.inner.watchers.notify_all();
    }

    /// Remove the next item without blocking.
    pub fn try_pop(&self) -> Option<T> {
        self.inner.queue.pop()
    }

    pub fn len(&self) -> usize {
        self.inner.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.queue.is_empty()
    }

    /// True if both handles refer to the same backlog.
    pub fn same(&self, other: &Backlog<T>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn watch(&self, signal: &Arc<Signal>) {
        self.inner.watchers.add(signal);
    }
}

impl<T> Clone for Backlog<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> Default for Backlog<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Backlog<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backlog").field("len", &self.len()).finish()
    }
}
