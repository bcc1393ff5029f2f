//! Wake signal shared between a dispatcher loop and everything that can
//! give it something new to look at.
//!
//! The signal is an epoch counter. A waiter reads the epoch, inspects its
//! state, and then sleeps only while the epoch is unchanged, so a notify that
//! lands between the inspection and the sleep is never lost.

use parking_lot::{Condvar, Mutex};
use std::sync::{Arc, Weak};
use std::time::Instant;

#[derive(Debug, Default)]
pub(crate) struct Signal {
    epoch: Mutex<u64>,
    cond: Condvar,
}

impl Signal {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Current epoch. Take this before inspecting state.
    pub(crate) fn epoch(&self) -> u64 {
        *self.epoch.lock()
    }

    pub(crate) fn notify(&self) {
        let mut epoch = self.epoch.lock();
        *epoch = epoch.wrapping_add(1);
        self.cond.notify_all();
    }

    /// Block until the epoch moves past `seen` or `deadline` passes.
    pub(crate) fn wait(&self, seen: u64, deadline: Option<Instant>) {
        let mut epoch = self.epoch.lock();
        while *epoch == seen {
            match deadline {
                Some(at) => {
                    if self.cond.wait_until(&mut epoch, at).timed_out() {
                        return;
                    }
                }
                None => self.cond.wait(&mut epoch),
            }
        }
    }
}

/// Set of signals to poke when something happens. Dead entries are pruned
/// lazily.
#[derive(Debug, Default)]
pub(crate) struct Watchers {
    signals: Mutex<Vec<Weak<Signal>>>,
}

impl Watchers {
    pub(crate) fn add(&self, signal: &Arc<Signal>) {
        let mut signals = self.signals.lock();
        signals.retain(|w| w.strong_count() > 0);
        signals.push(Arc::downgrade(signal));
    }

    pub(crate) fn notify_all(&self) {
        let live: Vec<Arc<Signal>> = self.signals.lock().iter().filter_map(Weak::upgrade).collect();
        for signal in live {
            signal.notify();
        }
    }
}
