//! Dispatcher: drains a backlog through a work callback with bounded
//! concurrency, while the callback keeps feeding the backlog.
//!
//! ```no_run
//! use taskgroup::{Dispatcher, Options};
//!
//! let dispatcher = Dispatcher::new(Options::new().limit(4).work(
//!     |d: &Dispatcher<String>, word: String| -> taskgroup::Result<()> {
//!         if word.len() > 1 {
//!             d.add(word[1..].to_string())?;
//!         }
//!         Ok(())
//!     },
//! ))?;
//! dispatcher.add("abcdef".to_string())?;
//! dispatcher.wait()?;
//! # Ok::<(), taskgroup::Error>(())
//! ```

mod options;
mod unit;

pub use options::{Options, WorkFn};

use crate::backlog::Backlog;
use crate::context::{Context, Reason};
use crate::error::{Error, Result};
use crate::signal::Signal;
use crate::telemetry::dispatch::{record_outcome, start_dispatch_span};
use crate::telemetry::metrics::DispatchMetrics;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use tracing::{Span, debug, info};
use uuid::Uuid;

const IDLE: u8 = 0;
const DRIVING: u8 = 1;
const FINISHED: u8 = 2;

/// Handle to one dispatcher. Clones share the same state; the handle passed
/// to the work callback is one of these clones.
pub struct Dispatcher<T> {
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    id: Uuid,
    name: String,
    backlog: Backlog<T>,
    limit: usize,
    active: AtomicUsize,
    /// Terminal error. Written at most once.
    terminal: Mutex<Option<Error>>,
    /// Derived from the caller's context; canceled on the first work error
    /// and when the drive operation returns.
    context: Context,
    signal: Arc<Signal>,
    work: Arc<WorkFn<T>>,
    phase: AtomicU8,
    span: Span,
    metrics: DispatchMetrics,
}

impl<T: Send + 'static> Dispatcher<T> {
    /// Build a dispatcher. Fails if no work callback was configured.
    pub fn new(options: Options<T>) -> Result<Self> {
        let work = options
            .work
            .ok_or_else(|| Error::Config("a work callback is required".to_string()))?;

        let id = Uuid::new_v4();
        let name = options
            .name
            .unwrap_or_else(|| format!("dispatch-{}", &id.to_string()[..8]));
        let context = options.context.unwrap_or_default().child();
        let backlog = options.backlog.unwrap_or_default();

        let signal = Signal::new();
        backlog.watch(&signal);
        context.watch(&signal);

        let span = start_dispatch_span(&name, &id, options.limit);
        let metrics = DispatchMetrics::new(&name);

        debug!(dispatcher = %name, limit = options.limit, "dispatcher created");

        Ok(Self {
            shared: Arc::new(Shared {
                id,
                name,
                backlog,
                limit: options.limit,
                active: AtomicUsize::new(0),
                terminal: Mutex::new(None),
                context,
                signal,
                work,
                phase: AtomicU8::new(IDLE),
                span,
                metrics,
            }),
        })
    }

    /// Enqueue an item.
    ///
    /// Succeeds even if the context is already canceled, in which case the
    /// item may never be processed. Fails once [`Dispatcher::wait`] has
    /// returned.
    pub fn add(&self, item: T) -> Result<()> {
        if self.shared.phase.load(Ordering::Acquire) == FINISHED {
            return Err(Error::Finished);
        }
        self.shared.backlog.push(item);
        self.shared
            .metrics
            .items_enqueued
            .add(1, self.shared.metrics.labels());
        Ok(())
    }

    /// Drive the backlog to completion on the calling thread.
    ///
    /// Returns the first error recorded during the run: a work error or a
    /// panic. The context's cancellation error is returned only if the run
    /// stopped with items still pending; a canceled run whose in-flight
    /// units finished everything returns `Ok`.
    pub fn wait(&self) -> Result<()> {
        if let Err(phase) = self.shared.phase.compare_exchange(
            IDLE,
            DRIVING,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            return Err(if phase == FINISHED {
                Error::Finished
            } else {
                Error::AlreadyWaiting
            });
        }

        let span = self.shared.span.clone();
        let _enter = span.enter();
        info!(pending = self.shared.backlog.len(), "dispatcher started");

        self.drive();

        self.shared.phase.store(FINISHED, Ordering::Release);
        self.shared.context.cancel();

        let terminal = self.shared.terminal.lock().take();
        let outcome = match &terminal {
            None => "ok",
            Some(err) if err.is_canceled() => "canceled",
            Some(_) => "error",
        };
        record_outcome(&span, outcome);
        self.shared
            .metrics
            .dispatch_terminal
            .add(1, &self.shared.metrics.labels_with("outcome", outcome));

        match terminal {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// The scheduling loop. Returns when this dispatcher has nothing left it
    /// may run.
    fn drive(&self) {
        let shared = &self.shared;
        // Set once the context is seen done. It only becomes the terminal
        // error if the loop stops with items still pending.
        let mut stopped: Option<Reason> = None;

        loop {
            let seen = shared.signal.epoch();
            let active = shared.active.load(Ordering::Acquire);

            if active == 0 && shared.backlog.is_empty() {
                return;
            }

            if stopped.is_none() {
                if let Some(reason) = shared.context.err() {
                    info!(?reason, active, "context done, draining in-flight units");
                    stopped = Some(reason);
                }
            }

            if let Some(reason) = stopped {
                if active == 0 {
                    if shared.backlog.is_empty() {
                        // Another consumer drained it since the check above.
                        return;
                    }
                    debug!(
                        discarded = shared.backlog.len(),
                        "stopped with items still pending"
                    );
                    self.record(reason.into());
                    return;
                }
            } else if shared.limit == 0 || active < shared.limit {
                if let Some(item) = shared.backlog.try_pop() {
                    self.launch(item);
                    continue;
                }
                if active == 0 {
                    // Another consumer took the item we saw; look again.
                    continue;
                }
            }

            // Once stopped, only unit completions matter; the deadline has
            // already been observed.
            let deadline = if stopped.is_some() {
                None
            } else {
                shared.context.deadline()
            };
            shared.signal.wait(seen, deadline);
        }
    }

    /// The run context handed to work callbacks.
    pub fn context(&self) -> &Context {
        &self.shared.context
    }
}

impl<T> Dispatcher<T> {
    /// Store `err` as the terminal error unless one is already set.
    fn record(&self, err: Error) -> bool {
        let mut terminal = self.shared.terminal.lock();
        if terminal.is_some() {
            return false;
        }
        *terminal = Some(err);
        true
    }

    /// Number of execution units currently running.
    pub fn active(&self) -> usize {
        self.shared.active.load(Ordering::Acquire)
    }

    /// Concurrency cap; 0 means unbounded.
    pub fn limit(&self) -> usize {
        self.shared.limit
    }

    pub fn backlog(&self) -> &Backlog<T> {
        &self.shared.backlog
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    /// True once the drive operation has returned.
    pub fn is_finished(&self) -> bool {
        self.shared.phase.load(Ordering::Acquire) == FINISHED
    }
}

impl<T> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for Dispatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("name", &self.shared.name)
            .field("limit", &self.shared.limit)
            .field("active", &self.active())
            .field("backlog", &self.shared.backlog)
            .finish()
    }
}
