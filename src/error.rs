//! Error types for taskgroup.

use thiserror::Error;

/// Boxed error returned by a work callback.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("dispatcher already finished")]
    Finished,

    #[error("dispatcher is already being driven")]
    AlreadyWaiting,

    #[error("context canceled")]
    Canceled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,

    #[error("{0}")]
    Work(#[source] BoxError),

    #[error("work panicked: {0}")]
    Panicked(String),

    #[error("failed to spawn execution unit: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for errors produced by a canceled or expired run context.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Canceled | Error::DeadlineExceeded)
    }

    /// Borrow the error a work callback returned, if this is one.
    ///
    /// Use `downcast_ref` on the result to recover the caller's own type.
    pub fn work_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Error::Work(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
