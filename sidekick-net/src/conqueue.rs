//! Unbounded thread-safe FIFO, matching
//! `examples/original_source/util/conqueue.hh`: one mutex, one "not empty"
//! condition variable. Used for the capture-to-aggregator handoff (§4.5) and
//! anywhere else a producer must never block on a consumer.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

pub struct Conqueue<T> {
    inner: Mutex<VecDeque<T>>,
    not_empty: Condvar,
}

impl<T> Default for Conqueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Conqueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
        }
    }

    pub fn push(&self, item: T) {
        let mut guard = self.inner.lock().unwrap();
        guard.push_back(item);
        self.not_empty.notify_one();
    }

    /// Blocks until an item is available.
    pub fn pop(&self) -> T {
        let mut guard = self.inner.lock().unwrap();
        loop {
            if let Some(item) = guard.pop_front() {
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
