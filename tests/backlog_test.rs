//! Integration tests for backlogs.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use taskgroup::{Backlog, Fifo, Lifo, Queue};

#[test]
fn fifo_order_for_single_producer() {
    let backlog = Backlog::new();
    for i in 0..10 {
        backlog.push(i);
    }
    assert_eq!(backlog.len(), 10);

    let drained: Vec<i32> = std::iter::from_fn(|| backlog.try_pop()).collect();
    assert_eq!(drained, (0..10).collect::<Vec<_>>());
    assert!(backlog.is_empty());
}

#[test]
fn try_pop_on_empty_returns_none() {
    let backlog: Backlog<String> = Backlog::new();
    assert_eq!(backlog.try_pop(), None);
    assert_eq!(backlog.len(), 0);
}

#[test]
fn lifo_pops_newest_first() {
    let queue = Lifo::new();
    queue.push("a");
    queue.push("b");
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.pop(), Some("b"));
    assert_eq!(queue.pop(), Some("a"));
    assert!(queue.is_empty());
}

#[test]
fn clones_share_items() {
    let backlog = Backlog::with_queue(Fifo::new());
    let other = backlog.clone();
    backlog.push(7);
    assert!(backlog.same(&other));
    assert_eq!(other.try_pop(), Some(7));
    assert!(backlog.is_empty());
    assert!(!backlog.same(&Backlog::new()));
}

#[test]
fn concurrent_producers_and_consumers_deliver_exactly_once() {
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 1_000;

    let backlog = Backlog::new();
    let seen = Arc::new(Mutex::new(HashSet::new()));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let backlog = backlog.clone();
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    backlog.push(p * PER_PRODUCER + i);
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..3)
        .map(|_| {
            let backlog = backlog.clone();
            let seen = Arc::clone(&seen);
            thread::spawn(move || {
                let mut idle = 0;
                while idle < 1_000 {
                    match backlog.try_pop() {
                        Some(item) => {
                            assert!(seen.lock().insert(item), "duplicate {item}");
                            idle = 0;
                        }
                        None => {
                            idle += 1;
                            thread::yield_now();
                        }
                    }
                }
            })
        })
        .collect();

    for handle in producers {
        handle.join().unwrap();
    }
    for handle in consumers {
        handle.join().unwrap();
    }

    // Anything the consumers gave up on is still in the backlog.
    while let Some(item) = backlog.try_pop() {
        assert!(seen.lock().insert(item), "duplicate {item}");
    }
    assert_eq!(seen.lock().len(), PRODUCERS * PER_PRODUCER);
}
