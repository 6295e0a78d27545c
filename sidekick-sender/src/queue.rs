//! The outbound buffer the producer feeds and the transmit thread drains
//! (§5): bounded, unlike `sidekick_net::Conqueue`, so a slow transmit
//! cadence applies backpressure to the producer instead of growing without
//! bound. Grounded the same way `Conqueue` is, in
//! `examples/original_source/util/conqueue.hh`, but with a capacity and the
//! second condition variable (`not_full`) that bounding requires.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

pub struct BoundedQueue<T> {
    capacity: usize,
    inner: Mutex<VecDeque<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "bounded queue capacity must be positive");
        Self {
            capacity,
            inner: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Blocks until there is room, then pushes.
    pub fn push(&self, item: T) {
        let mut guard = self.inner.lock().unwrap();
        while guard.len() >= self.capacity {
            guard = self.not_full.wait(guard).unwrap();
        }
        guard.push_back(item);
        self.not_empty.notify_one();
    }

    /// Blocks until an item is available, then pops.
    pub fn pop(&self) -> T {
        let mut guard = self.inner.lock().unwrap();
        loop {
            if let Some(item) = guard.pop_front() {
                self.not_full.notify_one();
                return item;
            }
            guard = self.not_empty.wait(guard).unwrap();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
