//! Dispatcher span helpers.
//!
//! Every dispatcher runs under one span. The scheduling loop and each
//! execution unit enter it, so unit events nest under the run that launched
//! them.

use tracing::Span;
use uuid::Uuid;

/// Start the span for one dispatcher.
///
/// The `dispatch.outcome` field is declared empty and filled by
/// [`record_outcome`] when the drive operation returns.
pub fn start_dispatch_span(name: &str, id: &Uuid, limit: usize) -> Span {
    tracing::info_span!(
        "dispatch.run",
        "dispatch.name" = name,
        "dispatch.id" = %id,
        "dispatch.limit" = limit,
        "dispatch.outcome" = tracing::field::Empty,
    )
}

/// Record how the run ended ("ok", "canceled", "error").
pub fn record_outcome(span: &Span, outcome: &str) {
    span.record("dispatch.outcome", outcome);
    span.in_scope(|| {
        tracing::info!(outcome, "dispatch finished");
    });
}
