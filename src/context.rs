//! Run context: a cooperative cancellation and deadline capability.
//!
//! A [`Context`] is cheap to clone and is handed to every execution unit.
//! Nothing is ever interrupted by it; long-running work is expected to poll
//! [`Context::is_done`] or block on [`Context::wait_timeout`].
//!
//! Contexts form a tree. Canceling a context cancels every child derived from
//! it, and a child's deadline is never later than its parent's.

use crate::error::Error;
use crate::signal::{Signal, Watchers};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

/// Why a context is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    Canceled,
    DeadlineExceeded,
}

impl From<Reason> for Error {
    fn from(reason: Reason) -> Self {
        match reason {
            Reason::Canceled => Error::Canceled,
            Reason::DeadlineExceeded => Error::DeadlineExceeded,
        }
    }
}

#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

struct Inner {
    deadline: Option<Instant>,
    cancelable: bool,
    state: Mutex<State>,
    cond: Condvar,
    watchers: Watchers,
}

#[derive(Default)]
struct State {
    reason: Option<Reason>,
    children: Vec<Weak<Inner>>,
}

impl Context {
    /// A context that is never canceled and has no deadline.
    pub fn background() -> Self {
        Self::root(false)
    }

    /// A root context that can be canceled with [`Context::cancel`].
    pub fn new() -> Self {
        Self::root(true)
    }

    fn root(cancelable: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                deadline: None,
                cancelable,
                state: Mutex::new(State::default()),
                cond: Condvar::new(),
                watchers: Watchers::default(),
            }),
        }
    }

    /// Derive a cancelable child. Canceling the child leaves the parent alone.
    pub fn child(&self) -> Self {
        self.derive(None)
    }

    /// Derive a child that expires at `deadline` (or earlier, if the parent
    /// expires first).
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        self.derive(Some(deadline))
    }

    /// Derive a child that expires `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    fn derive(&self, deadline: Option<Instant>) -> Self {
        let deadline = match (self.inner.deadline, deadline) {
            (Some(parent), Some(own)) => Some(parent.min(own)),
            (parent, own) => parent.or(own),
        };

        let child = Arc::new(Inner {
            deadline,
            cancelable: true,
            state: Mutex::new(State::default()),
            cond: Condvar::new(),
            watchers: Watchers::default(),
        });

        let mut parent = self.inner.state.lock();
        match parent.reason {
            Some(reason) => child.state.lock().reason = Some(reason),
            None => {
                parent.children.retain(|c| c.strong_count() > 0);
                parent.children.push(Arc::downgrade(&child));
            }
        }
        drop(parent);

        Self { inner: child }
    }

    /// Cancel this context and all of its descendants. Has no effect on a
    /// background context or one that is already done.
    pub fn cancel(&self) {
        if self.inner.cancelable {
            self.inner.finish(Reason::Canceled);
        }
    }

    /// `None` while the context is live, otherwise why it ended.
    pub fn err(&self) -> Option<Reason> {
        if let Some(reason) = self.inner.state.lock().reason {
            return Some(reason);
        }
        match self.inner.deadline {
            Some(at) if Instant::now() >= at => {
                self.inner.finish(Reason::DeadlineExceeded);
                self.inner.state.lock().reason
            }
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Block until the context is done. Never returns for a background
    /// context.
    pub fn wait(&self) -> Reason {
        loop {
            if let Some(reason) = self.wait_until(self.inner.deadline) {
                return reason;
            }
        }
    }

    /// Block for at most `timeout`. Returns the reason if the context ended
    /// in that window.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Reason> {
        let limit = Instant::now() + timeout;
        let until = match self.inner.deadline {
            Some(at) => at.min(limit),
            None => limit,
        };
        self.wait_until(Some(until))
    }

    fn wait_until(&self, until: Option<Instant>) -> Option<Reason> {
        {
            let mut state = self.inner.state.lock();
            while state.reason.is_none() {
                match until {
                    Some(at) => {
                        if self.inner.cond.wait_until(&mut state, at).timed_out() {
                            break;
                        }
                    }
                    None => self.inner.cond.wait(&mut state),
                }
            }
        }
        self.err()
    }

    /// Register a signal to be notified when this context ends.
    pub(crate) fn watch(&self, signal: &Arc<Signal>) {
        self.inner.watchers.add(signal);
    }
}

impl Inner {
    fn finish(&self, reason: Reason) {
        let children = {
            let mut state = self.state.lock();
            if state.reason.is_some() {
                return;
            }
            state.reason = Some(reason);
            std::mem::take(&mut state.children)
        };
        self.cond.notify_all();
        self.watchers.notify_all();

        for child in children.iter().filter_map(Weak::upgrade) {
            child.finish(reason);
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("cancelable", &self.inner.cancelable)
            .field("deadline", &self.inner.deadline)
            .field("reason", &self.inner.state.lock().reason)
            .finish()
    }
}
