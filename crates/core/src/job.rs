//! A single render of one page at one target size
//!
//! The job reports lifecycle transitions to the in-flight table and polls its
//! cancellation token before rasterizing and again before committing the
//! result. It never interrupts the rasterizer itself.

use crate::inflight::InFlightTable;
use crate::key::PageKey;
use crate::snapshot::SnapshotState;
use log::{debug, trace, warn};
use pdf_snapshot_cache::SnapshotCache;
use pdf_snapshot_render::{Bitmap, Document, Rasterizer, Size};
use pdf_snapshot_scheduler::CancellationToken;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// How a job ended
#[derive(Debug, Clone)]
pub(crate) enum JobOutcome {
    /// Bitmap produced and written to the cache
    Finished(Arc<Bitmap>),
    /// No bitmap; any cache entry for the key was purged
    Failed,
    /// Cancelled before rasterization started; nothing was touched
    Abandoned,
}

pub(crate) struct RenderJob {
    key: PageKey,
    document: Arc<dyn Document>,
    page_index: usize,
    target: Size,
    token: CancellationToken,
}

impl RenderJob {
    pub(crate) fn new(
        key: PageKey,
        document: Arc<dyn Document>,
        page_index: usize,
        target: Size,
        token: CancellationToken,
    ) -> Self {
        Self {
            key,
            document,
            page_index,
            target,
            token,
        }
    }

    pub(crate) fn key(&self) -> &PageKey {
        &self.key
    }

    pub(crate) fn document(&self) -> &Arc<dyn Document> {
        &self.document
    }

    pub(crate) fn page_index(&self) -> usize {
        self.page_index
    }

    pub(crate) fn target(&self) -> Size {
        self.target
    }

    /// Execute the job. Called at most once, on a pool worker.
    pub(crate) fn run(
        &self,
        table: &InFlightTable,
        rasterizer: &dyn Rasterizer,
        cache: &SnapshotCache<PageKey, Arc<Bitmap>>,
    ) -> JobOutcome {
        table.transition(&self.key, SnapshotState::Started);

        if self.token.is_cancelled() {
            debug!("render of {} cancelled before start", self.key);
            return JobOutcome::Abandoned;
        }

        match self.rasterize(rasterizer) {
            Some(bitmap) => {
                let bitmap = Arc::new(bitmap);
                table.transition(&self.key, SnapshotState::Finished);

                // The work is paid for; cancellation only suppresses delivery
                if self.token.is_cancelled() {
                    trace!("render of {} cancelled after rasterization", self.key);
                }
                cache.put(self.key.clone(), Arc::clone(&bitmap));

                debug!(
                    "rendered {} at {}x{}",
                    self.key,
                    bitmap.width(),
                    bitmap.height()
                );
                JobOutcome::Finished(bitmap)
            }
            None => {
                table.transition(&self.key, SnapshotState::Failed);
                // A stale bitmap must not outlive a failed re-render
                cache.remove(&self.key);
                debug!("render of {} failed", self.key);
                JobOutcome::Failed
            }
        }
    }

    /// Like [`run`](Self::run), but a panic in the document or rasterizer
    /// ends the job as `Failed` instead of unwinding into the worker
    pub(crate) fn run_isolated(
        &self,
        table: &InFlightTable,
        rasterizer: &dyn Rasterizer,
        cache: &SnapshotCache<PageKey, Arc<Bitmap>>,
    ) -> JobOutcome {
        match panic::catch_unwind(AssertUnwindSafe(|| self.run(table, rasterizer, cache))) {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("render of {} panicked", self.key);
                table.transition(&self.key, SnapshotState::Failed);
                cache.remove(&self.key);
                JobOutcome::Failed
            }
        }
    }

    fn rasterize(&self, rasterizer: &dyn Rasterizer) -> Option<Bitmap> {
        let Some(page) = self.document.page(self.page_index) else {
            debug!(
                "page {} out of range for document {} ({} pages)",
                self.page_index,
                self.document.id(),
                self.document.page_count()
            );
            return None;
        };
        let overlay = self.document.annotations(self.page_index);
        rasterizer.rasterize(&page.content, page.size, self.target, &overlay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inflight::InFlight;
    use pdf_snapshot_cache::CacheLimits;
    use pdf_snapshot_render::{MemoryDocument, Page, PageContent, VectorRasterizer};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixture {
        table: InFlightTable,
        cache: SnapshotCache<PageKey, Arc<Bitmap>>,
        document: Arc<MemoryDocument>,
        token: CancellationToken,
    }

    impl Fixture {
        fn new() -> Self {
            let document = Arc::new(MemoryDocument::with_id("doc"));
            document.push_page(Page::blank(Size::new(200.0, 100.0)));
            Self {
                table: InFlightTable::default(),
                cache: SnapshotCache::new(CacheLimits::default()),
                document,
                token: CancellationToken::new(),
            }
        }

        fn job(&self, page_index: usize) -> RenderJob {
            let key = PageKey::new("doc", page_index);
            self.table
                .lock()
                .insert(key.clone(), InFlight::new(self.token.clone(), Vec::new()));
            RenderJob::new(
                key,
                self.document.clone(),
                page_index,
                Size::new(100.0, 100.0),
                self.token.clone(),
            )
        }
    }

    /// Counts calls, optionally cancelling a token mid-render
    struct Counting {
        calls: AtomicUsize,
        cancel: Option<CancellationToken>,
    }

    impl Rasterizer for Counting {
        fn rasterize(
            &self,
            content: &PageContent,
            native: Size,
            target: Size,
            overlay: &[pdf_snapshot_render::DrawOp],
        ) -> Option<Bitmap> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(token) = &self.cancel {
                token.cancel();
            }
            VectorRasterizer::new().rasterize(content, native, target, overlay)
        }
    }

    #[test]
    fn test_success_caches_bitmap() {
        let fx = Fixture::new();
        let job = fx.job(0);

        let outcome = job.run(&fx.table, &VectorRasterizer::new(), &fx.cache);

        let JobOutcome::Finished(bitmap) = outcome else {
            panic!("expected a finished render");
        };
        assert_eq!(bitmap.dimensions(), (100, 50));
        assert!(fx.cache.contains(job.key()));
        assert_eq!(fx.table.state(job.key()), Some(SnapshotState::Finished));
    }

    #[test]
    fn test_missing_page_fails_and_purges() {
        let fx = Fixture::new();
        let job = fx.job(5);
        fx.cache.put(job.key().clone(), Arc::new(Bitmap::new(1, 1)));

        let outcome = job.run(&fx.table, &VectorRasterizer::new(), &fx.cache);

        assert!(matches!(outcome, JobOutcome::Failed));
        assert!(!fx.cache.contains(job.key()));
        assert_eq!(fx.table.state(job.key()), Some(SnapshotState::Failed));
    }

    #[test]
    fn test_cancelled_before_start_is_abandoned() {
        let fx = Fixture::new();
        let job = fx.job(0);
        fx.cache.put(job.key().clone(), Arc::new(Bitmap::new(1, 1)));
        fx.token.cancel();

        let counting = Counting {
            calls: AtomicUsize::new(0),
            cancel: None,
        };
        let outcome = job.run(&fx.table, &counting, &fx.cache);

        assert!(matches!(outcome, JobOutcome::Abandoned));
        assert_eq!(counting.calls.load(Ordering::SeqCst), 0);
        // Left at Started; the existing entry is not poisoned
        assert_eq!(fx.table.state(job.key()), Some(SnapshotState::Started));
        assert!(fx.cache.contains(job.key()));
    }

    #[test]
    fn test_cancelled_after_render_still_caches() {
        let fx = Fixture::new();
        let job = fx.job(0);
        let counting = Counting {
            calls: AtomicUsize::new(0),
            cancel: Some(fx.token.clone()),
        };

        let outcome = job.run(&fx.table, &counting, &fx.cache);

        assert!(matches!(outcome, JobOutcome::Finished(_)));
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
        assert!(fx.cache.contains(job.key()));
    }

    #[test]
    fn test_overlay_reaches_rasterizer() {
        use pdf_snapshot_render::{Color, DrawOp, Rect};

        let fx = Fixture::new();
        fx.document.add_annotation(
            0,
            DrawOp::FillRect {
                rect: Rect::new(0.0, 0.0, 200.0, 100.0),
                color: Color::rgb(255, 0, 0),
            },
        );
        let job = fx.job(0);

        let JobOutcome::Finished(bitmap) = job.run(&fx.table, &VectorRasterizer::new(), &fx.cache)
        else {
            panic!("expected a finished render");
        };
        assert_eq!(bitmap.get_pixel(50, 25).0, [255, 0, 0, 255]);
    }

    struct Exploding;

    impl Rasterizer for Exploding {
        fn rasterize(
            &self,
            _content: &PageContent,
            _native: Size,
            _target: Size,
            _overlay: &[pdf_snapshot_render::DrawOp],
        ) -> Option<Bitmap> {
            panic!("rasterizer crashed");
        }
    }

    #[test]
    fn test_panicking_rasterizer_fails_job() {
        let fx = Fixture::new();
        let job = fx.job(0);
        fx.cache.put(job.key().clone(), Arc::new(Bitmap::new(1, 1)));

        let outcome = job.run_isolated(&fx.table, &Exploding, &fx.cache);

        assert!(matches!(outcome, JobOutcome::Failed));
        assert_eq!(fx.table.state(job.key()), Some(SnapshotState::Failed));
        assert!(!fx.cache.contains(job.key()));
    }
}
