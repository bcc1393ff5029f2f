//! Dispatcher construction options.

use crate::backlog::Backlog;
use crate::context::Context;
use crate::error::BoxError;
use std::fmt;
use std::sync::Arc;

use super::Dispatcher;

/// Work callback: processes one item and may enqueue more through the handle.
pub type WorkFn<T> = dyn Fn(&Dispatcher<T>, T) -> Result<(), BoxError> + Send + Sync;

/// Configuration for a [`Dispatcher`].
///
/// Only `work` is required; [`Dispatcher::new`] fails without it.
pub struct Options<T> {
    /// Run context. Defaults to [`Context::background`].
    pub context: Option<Context>,
    /// Concurrency cap. 0 means unbounded.
    pub limit: usize,
    pub work: Option<Arc<WorkFn<T>>>,
    /// Backlog to drain. Defaults to a fresh private FIFO.
    pub backlog: Option<Backlog<T>>,
    /// Label for the dispatcher's span, metrics and unit threads.
    pub name: Option<String>,
}

impl<T> Options<T> {
    pub fn new() -> Self {
        Self {
            context: None,
            limit: 0,
            work: None,
            backlog: None,
            name: None,
        }
    }

    pub fn context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Set the work callback. Any error type convertible into a boxed error
    /// is accepted, including `anyhow::Error`.
    pub fn work<F, E>(mut self, work: F) -> Self
    where
        T: 'static,
        F: Fn(&Dispatcher<T>, T) -> Result<(), E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let work: Arc<WorkFn<T>> = Arc::new(move |dispatcher: &Dispatcher<T>, item: T| {
            work(dispatcher, item).map_err(Into::into)
        });
        self.work = Some(work);
        self
    }

    pub fn backlog(mut self, backlog: Backlog<T>) -> Self {
        self.backlog = Some(backlog);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl<T> Default for Options<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Options<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("context", &self.context)
            .field("limit", &self.limit)
            .field("work", &self.work.as_ref().map(|_| "<fn>"))
            .field("backlog", &self.backlog)
            .field("name", &self.name)
            .finish()
    }
}
