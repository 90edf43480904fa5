//! Delivery contexts for completion callbacks
//!
//! Completions are never run under dispatcher locks. They are handed to a
//! [`DeliveryContext`], which decides where they execute: inline on the
//! worker that finished the render, or queued for a specific owning thread
//! such as a UI loop.

use log::trace;
use parking_lot::Mutex;
use pdf_snapshot_scheduler::Task;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

/// Where completion callbacks run
pub trait DeliveryContext: Send + Sync {
    /// Arrange for `task` to run on this context
    fn dispatch(&self, task: Task);
}

/// Runs tasks immediately on the dispatching thread
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

impl DeliveryContext for Immediate {
    fn dispatch(&self, task: Task) {
        task();
    }
}

/// Sending half of a delivery queue; hand this to the dispatcher
pub struct DeliveryQueue {
    sender: Mutex<Sender<Task>>,
}

/// Receiving half of a delivery queue, owned by the thread that should run
/// completions
pub struct DeliveryLoop {
    receiver: Receiver<Task>,
}

/// Create a queue whose tasks run on whichever thread drives the
/// [`DeliveryLoop`]
pub fn delivery_queue() -> (DeliveryQueue, DeliveryLoop) {
    let (sender, receiver) = mpsc::channel();
    (
        DeliveryQueue {
            sender: Mutex::new(sender),
        },
        DeliveryLoop { receiver },
    )
}

impl DeliveryContext for DeliveryQueue {
    fn dispatch(&self, task: Task) {
        if self.sender.lock().send(task).is_err() {
            trace!("delivery loop dropped; discarding completion");
        }
    }
}

impl DeliveryLoop {
    /// Run every task that is already queued, without waiting
    ///
    /// Returns the number of tasks run.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.receiver.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Wait up to `timeout` for one task and run it
    ///
    /// Returns `false` if nothing arrived in time or every sender is gone.
    pub fn run_next(&self, timeout: Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Ok(task) => {
                task();
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Run tasks as they arrive until `done` returns true or `timeout`
    /// elapses
    ///
    /// Returns whether `done` was satisfied.
    pub fn run_until(&self, timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if done() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            match self.receiver.recv_timeout(deadline - now) {
                Ok(task) => task(),
                Err(RecvTimeoutError::Timeout) => return done(),
                Err(RecvTimeoutError::Disconnected) => return done(),
            }
        }
    }
}
