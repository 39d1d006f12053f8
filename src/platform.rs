//! Platform capabilities - the deferred-work seam.
//!
//! The scheduler never runs work on its own; it hands a task to whatever
//! [`Microtasks`] implementation the host provides. A browser host would
//! forward to `queueMicrotask`; native hosts and tests use
//! [`MicrotaskQueue`] and drain it once the current synchronous turn ends.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

/// A unit of deferred work.
pub type Microtask = Box<dyn FnOnce()>;

/// Host facility that runs a task after the current synchronous call stack
/// completes and before the next timer or I/O callback.
pub trait Microtasks {
    fn queue_microtask(&self, task: Microtask);
}

// =============================================================================
// MicrotaskQueue
// =============================================================================

/// Single-threaded FIFO microtask queue.
///
/// The host calls [`run_until_idle`](Self::run_until_idle) at the end of
/// each turn. Tasks queued while draining run in the same drain, after the
/// tasks already waiting.
#[derive(Default)]
pub struct MicrotaskQueue {
    tasks: RefCell<VecDeque<Microtask>>,
    draining: Cell<bool>,
}

impl MicrotaskQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting.
    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Check if no task is waiting.
    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    /// Run tasks until the queue is empty. Returns how many ran.
    ///
    /// Re-entrant calls (a task draining the queue it runs on) return 0;
    /// the outer drain picks the work up.
    pub fn run_until_idle(&self) -> usize {
        if self.draining.replace(true) {
            return 0;
        }
        let mut ran = 0;
        loop {
            // Pop before running so tasks can queue more work.
            let task = self.tasks.borrow_mut().pop_front();
            match task {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => break,
            }
        }
        self.draining.set(false);
        ran
    }

    /// End the current turn. Alias of [`run_until_idle`](Self::run_until_idle).
    pub fn tick(&self) -> usize {
        self.run_until_idle()
    }
}

impl Microtasks for MicrotaskQueue {
    fn queue_microtask(&self, task: Microtask) {
        self.tasks.borrow_mut().push_back(task);
    }
}
