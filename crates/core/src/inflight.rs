//! Table of renders currently in flight
//!
//! Holds at most one entry per [`PageKey`]. The entry carries the job's
//! lifecycle state, its cancellation token and every request waiting on it.
//! All of it is guarded by one lock, so attaching a waiter, advancing the
//! state and retiring the entry are totally ordered.

use crate::key::PageKey;
use crate::snapshot::{Snapshot, SnapshotState};
use log::warn;
use parking_lot::{Mutex, MutexGuard};
use pdf_snapshot_scheduler::CancellationToken;
use std::collections::HashMap;

/// Completion callback supplied to `fetch`
pub(crate) type Completion = Box<dyn FnOnce(Snapshot) + Send + 'static>;

/// One request waiting for a render
pub(crate) struct Waiter {
    pub(crate) snapshot: Snapshot,
    pub(crate) on_complete: Completion,
}

/// Bookkeeping for one running or queued render
pub(crate) struct InFlight {
    pub(crate) state: SnapshotState,
    pub(crate) token: CancellationToken,
    pub(crate) waiters: Vec<Waiter>,
}

impl InFlight {
    pub(crate) fn new(token: CancellationToken, waiters: Vec<Waiter>) -> Self {
        Self {
            state: SnapshotState::New,
            token,
            waiters,
        }
    }

    fn cancel(&self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.token.cancel();
        true
    }
}

pub(crate) type Jobs = HashMap<PageKey, InFlight>;

#[derive(Default)]
pub(crate) struct InFlightTable {
    jobs: Mutex<Jobs>,
}

impl InFlightTable {
    pub(crate) fn lock(&self) -> MutexGuard<'_, Jobs> {
        self.jobs.lock()
    }

    /// Advance the lifecycle state of the job for `key`
    pub(crate) fn transition(&self, key: &PageKey, next: SnapshotState) {
        let mut jobs = self.jobs.lock();
        match jobs.get_mut(key) {
            Some(entry) if entry.state.can_become(next) => entry.state = next,
            Some(entry) => warn!(
                "ignoring transition {:?} -> {:?} for {}",
                entry.state, next, key
            ),
            None => warn!("transition to {:?} for {} with no job in flight", next, key),
        }
    }

    /// Remove the job for `key`, handing back its bookkeeping
    pub(crate) fn retire(&self, key: &PageKey) -> Option<InFlight> {
        self.jobs.lock().remove(key)
    }

    pub(crate) fn state(&self, key: &PageKey) -> Option<SnapshotState> {
        self.jobs.lock().get(key).map(|entry| entry.state)
    }

    pub(crate) fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Cancel the job for `key`
    ///
    /// False when nothing is in flight for it or the job already reached a
    /// terminal state; a final result is always delivered.
    pub(crate) fn cancel(&self, key: &PageKey) -> bool {
        match self.jobs.lock().get(key) {
            Some(entry) => entry.cancel(),
            None => false,
        }
    }

    /// Cancel every job that has not finished, returning how many were cancelled
    pub(crate) fn cancel_all(&self) -> usize {
        self.jobs
            .lock()
            .values()
            .filter(|entry| entry.cancel())
            .count()
    }
}
