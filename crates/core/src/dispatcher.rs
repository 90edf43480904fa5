//! Render dispatcher
//!
//! Entry point for page requests. A request is answered from the cache when
//! possible, attached to the render already in flight for the same page, or
//! turned into a new render job on the worker pool. Every request receives
//! exactly one completion on the delivery context.

use crate::config::RenderConfig;
use crate::delivery::DeliveryContext;
use crate::error::DispatchError;
use crate::inflight::{Completion, InFlight, InFlightTable, Jobs, Waiter};
use crate::job::{JobOutcome, RenderJob};
use crate::key::PageKey;
use crate::snapshot::{Snapshot, SnapshotState};
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use pdf_snapshot_cache::SnapshotCache;
use pdf_snapshot_render::{Bitmap, Document, Rasterizer, Size};
use pdf_snapshot_scheduler::{CancellationToken, WorkerPool};
use std::sync::Arc;

/// Invoked once per completed render (finished or failed)
type ProgressHandler = Arc<dyn Fn(&Snapshot) + Send + Sync + 'static>;

/// Dispatcher statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    /// Total `fetch` calls
    pub requests: u64,

    /// Requests answered from the cache
    pub cache_hits: u64,

    /// Requests attached to a render already in flight
    pub coalesced: u64,

    /// Render jobs submitted to the pool
    pub renders_started: u64,

    /// Renders that produced a bitmap
    pub renders_finished: u64,

    /// Renders that produced no bitmap
    pub renders_failed: u64,

    /// Renders cancelled before they completed
    pub renders_cancelled: u64,
}

/// State shared between the dispatcher and its render jobs
struct Shared {
    table: InFlightTable,
    cache: SnapshotCache<PageKey, Arc<Bitmap>>,
    rasterizer: Arc<dyn Rasterizer>,
    delivery: Arc<dyn DeliveryContext>,
    progress: RwLock<Option<ProgressHandler>>,
    stats: Mutex<DispatcherStats>,
}

impl Shared {
    fn deliver(&self, snapshot: Snapshot, on_complete: Completion) {
        self.delivery
            .dispatch(Box::new(move || on_complete(snapshot)));
    }

    /// Retire a finished job and notify everyone attached to it
    fn complete(&self, job: &RenderJob, outcome: JobOutcome) {
        // The job's cache write (or purge) is already committed here, so a
        // request arriving after retirement sees the final cache state
        let Some(entry) = self.table.retire(job.key()) else {
            warn!("completed render {} was not in flight", job.key());
            return;
        };

        let abandoned = matches!(outcome, JobOutcome::Abandoned);
        let (state, bitmap) = match outcome {
            JobOutcome::Finished(bitmap) => (SnapshotState::Finished, Some(bitmap)),
            JobOutcome::Failed | JobOutcome::Abandoned => (SnapshotState::Failed, None),
        };

        {
            let mut stats = self.stats.lock();
            if entry.token.is_cancelled() {
                stats.renders_cancelled += 1;
            }
            if !abandoned {
                match state {
                    SnapshotState::Finished => stats.renders_finished += 1,
                    _ => stats.renders_failed += 1,
                }
            }
        }

        debug!(
            "delivering {} to {} waiter(s) as {:?}{}",
            job.key(),
            entry.waiters.len(),
            state,
            if abandoned { " (cancelled)" } else { "" }
        );
        for Waiter {
            mut snapshot,
            on_complete,
        } in entry.waiters
        {
            snapshot.resolve(state, bitmap.clone());
            self.deliver(snapshot, on_complete);
        }

        if abandoned {
            return;
        }
        let handler = self.progress.read().clone();
        if let Some(handler) = handler {
            let mut snapshot = Snapshot::new(
                Arc::clone(job.document()),
                job.page_index(),
                job.key().clone(),
                job.target(),
            );
            snapshot.resolve(state, bitmap);
            self.delivery
                .dispatch(Box::new(move || handler(&snapshot)));
        }
    }
}

/// Concurrent page render dispatcher
///
/// Owns a cost-bounded snapshot cache, a bounded worker pool and the table of
/// renders in flight. Independent instances share nothing, so tests and
/// separate viewers can each construct their own.
///
/// Requests for the same page are coalesced by [`PageKey`], which ignores
/// the target size: a page is rendered once at the size of the request that
/// started the render, and concurrent requests share that result.
pub struct RenderDispatcher {
    shared: Arc<Shared>,
    pool: WorkerPool,
    config: RenderConfig,
}

impl RenderDispatcher {
    /// Create a dispatcher and start its worker pool
    ///
    /// # Errors
    /// Fails if the configuration is invalid or worker threads cannot be
    /// spawned.
    pub fn new(
        config: RenderConfig,
        rasterizer: Arc<dyn Rasterizer>,
        delivery: Arc<dyn DeliveryContext>,
    ) -> Result<Self, DispatchError> {
        config.validate()?;
        let pool = WorkerPool::new(config.pool_config())?;

        let shared = Arc::new(Shared {
            table: InFlightTable::default(),
            cache: SnapshotCache::new(config.cache_limits()),
            rasterizer,
            delivery,
            progress: RwLock::new(None),
            stats: Mutex::new(DispatcherStats::default()),
        });

        info!(
            "render dispatcher ready: {} workers, cache {} entries / {} bytes",
            config.max_concurrent_renders,
            config.cache_entry_count_limit,
            config.cache_total_cost_limit_bytes
        );

        Ok(Self {
            shared,
            pool,
            config,
        })
    }

    /// Request a bitmap of `page_index` fitted into `target`
    ///
    /// Never blocks on rendering. `on_complete` runs exactly once on the
    /// delivery context with this request's own snapshot.
    pub fn fetch<F>(
        &self,
        document: Arc<dyn Document>,
        page_index: usize,
        target: Size,
        on_complete: F,
    ) where
        F: FnOnce(Snapshot) + Send + 'static,
    {
        let key = PageKey::for_page(document.as_ref(), page_index);
        let mut snapshot = Snapshot::new(Arc::clone(&document), page_index, key.clone(), target);
        self.shared.stats.lock().requests += 1;

        let mut jobs = self.shared.table.lock();

        // Cache lookup happens under the table lock so it cannot interleave
        // with a job retiring between its cache write and its removal
        if let Some(bitmap) = self.shared.cache.get(&key) {
            self.shared.stats.lock().cache_hits += 1;
            snapshot.resolve(SnapshotState::Finished, Some(bitmap));

            let revalidate = if self.config.revalidate_on_hit && !jobs.contains_key(&key) {
                debug!("revalidating cached {}", key);
                self.start_job(&mut jobs, key, document, page_index, target, Vec::new())
            } else {
                Vec::new()
            };
            drop(jobs);

            self.shared.deliver(snapshot, Box::new(on_complete));
            self.fail_waiters(revalidate);
            return;
        }

        let waiter = Waiter {
            snapshot,
            on_complete: Box::new(on_complete),
        };

        if let Some(entry) = jobs.get_mut(&key) {
            entry.waiters.push(waiter);
            self.shared.stats.lock().coalesced += 1;
            debug!(
                "coalesced request for {} ({} waiting)",
                key,
                entry.waiters.len()
            );
            return;
        }

        let rejected = self.start_job(&mut jobs, key, document, page_index, target, vec![waiter]);
        drop(jobs);
        self.fail_waiters(rejected);
    }

    /// Register and submit a new job while the table lock is held
    ///
    /// Returns the waiters to fail if the pool refused the job.
    fn start_job(
        &self,
        jobs: &mut Jobs,
        key: PageKey,
        document: Arc<dyn Document>,
        page_index: usize,
        target: Size,
        waiters: Vec<Waiter>,
    ) -> Vec<Waiter> {
        let token = CancellationToken::new();
        let job = RenderJob::new(key.clone(), document, page_index, target, token.clone());
        let shared = Arc::clone(&self.shared);

        let submitted = self.pool.submit(move || {
            let outcome =
                job.run_isolated(&shared.table, shared.rasterizer.as_ref(), &shared.cache);
            shared.complete(&job, outcome);
        });

        match submitted {
            Ok(()) => {
                jobs.insert(key, InFlight::new(token, waiters));
                self.shared.stats.lock().renders_started += 1;
                Vec::new()
            }
            Err(err) => {
                warn!("cannot render {}: {}", key, err);
                waiters
            }
        }
    }

    fn fail_waiters(&self, waiters: Vec<Waiter>) {
        for Waiter {
            mut snapshot,
            on_complete,
        } in waiters
        {
            snapshot.resolve(SnapshotState::Failed, None);
            self.shared.deliver(snapshot, on_complete);
        }
    }

    /// Cancel the render in flight for a page
    ///
    /// Cancellation covers every request coalesced onto that render. If the
    /// render has not started rasterizing, they all receive a `Failed`
    /// snapshot; a render already under way still delivers its result.
    /// Returns `false` if nothing cancellable was in flight.
    pub fn cancel(&self, document: &dyn Document, page_index: usize) -> bool {
        self.shared
            .table
            .cancel(&PageKey::for_page(document, page_index))
    }

    /// Cancel every render in flight, returning how many were cancelled
    pub fn cancel_all(&self) -> usize {
        self.shared.table.cancel_all()
    }

    /// Drop every cached bitmap; hook this to the host's memory warning
    pub fn handle_memory_pressure(&self) {
        info!("memory pressure: clearing snapshot cache");
        self.shared.cache.clear();
    }

    /// Register a callback run on the delivery context after each render
    /// finishes or fails. Renders cancelled before they started are not
    /// reported.
    pub fn set_progress_handler<F>(&self, handler: F)
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        *self.shared.progress.write() = Some(Arc::new(handler));
    }

    pub fn clear_progress_handler(&self) {
        *self.shared.progress.write() = None;
    }

    /// Lifecycle state of the render in flight for a page, if any
    pub fn job_state(&self, document: &dyn Document, page_index: usize) -> Option<SnapshotState> {
        self.shared
            .table
            .state(&PageKey::for_page(document, page_index))
    }

    /// Number of renders queued or running
    pub fn in_flight(&self) -> usize {
        self.shared.table.len()
    }

    /// The snapshot cache
    pub fn cache(&self) -> &SnapshotCache<PageKey, Arc<Bitmap>> {
        &self.shared.cache
    }

    pub fn stats(&self) -> DispatcherStats {
        *self.shared.stats.lock()
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Cancel all renders and stop the worker pool
    ///
    /// Queued jobs still run to observe their cancellation and fail their
    /// waiters, so every pending request is answered and the in-flight table
    /// is empty afterwards. Later cache misses fail immediately.
    pub fn shutdown(&self) {
        let cancelled = self.cancel_all();
        debug!("shutting down dispatcher ({} renders cancelled)", cancelled);
        self.pool.shutdown();
    }
}

impl Drop for RenderDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
