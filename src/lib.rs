//! # taskgroup
//!
//! Bounded concurrent dispatcher for self-feeding workloads.
//!
//! A [`Dispatcher`] drains a [`Backlog`] through a work callback on up to
//! `limit` threads at once. The callback may enqueue more items while it
//! runs, so tree walks and crawlers need no extra synchronization. The first
//! error wins, cancellation is cooperative through a [`Context`], and several
//! dispatchers can share one backlog.

pub mod backlog;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
mod signal;
pub mod telemetry;
pub mod walk;

pub use backlog::{Backlog, Fifo, Lifo, Queue};
pub use context::{Context, Reason};
pub use dispatcher::{Dispatcher, Options, WorkFn};
pub use error::{BoxError, Error, Result};
