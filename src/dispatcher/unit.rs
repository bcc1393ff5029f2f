//! Execution units: one thread per launched item.

use crate::error::Error;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Instant;
use tracing::{debug, warn};

use super::Dispatcher;

impl<T: Send + 'static> Dispatcher<T> {
    /// Count the unit as active and start it on its own thread.
    pub(super) fn launch(&self, item: T) {
        let shared = &self.shared;
        shared.active.fetch_add(1, Ordering::AcqRel);
        shared.metrics.units_started.add(1, shared.metrics.labels());

        let unit = self.clone();
        let span = shared.span.clone();
        let spawned = thread::Builder::new()
            .name(format!("{}-unit", shared.name))
            .spawn(move || {
                let _enter = span.enter();
                unit.run(item);
            });

        if let Err(e) = spawned {
            warn!(error = %e, "failed to spawn execution unit");
            self.record(Error::Spawn(e));
            self.shared.context.cancel();
            self.complete();
        }
    }

    /// Unit body: run the callback, record a failure, then release the slot.
    fn run(&self, item: T) {
        let shared = &self.shared;
        let start = Instant::now();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (shared.work)(self, item)));

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        shared
            .metrics
            .unit_duration_ms
            .record(duration_ms, shared.metrics.labels());

        let (result, failure) = match outcome {
            Ok(Ok(())) => ("ok", None),
            Ok(Err(e)) => ("error", Some(Error::Work(e))),
            Err(payload) => ("panic", Some(Error::Panicked(panic_message(payload.as_ref())))),
        };
        shared
            .metrics
            .units_finished
            .add(1, &shared.metrics.labels_with("result", result));

        match failure {
            Some(err) => {
                warn!(error = %err, duration_ms, "work failed");
                // The error must be visible before the slot is released, so
                // the loop never sees an idle dispatcher without it.
                if self.record(err) {
                    shared.context.cancel();
                }
            }
            None => debug!(duration_ms, "work done"),
        }

        self.complete();
    }

    fn complete(&self) {
        self.shared.active.fetch_sub(1, Ordering::AcqRel);
        self.shared.signal.notify();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
