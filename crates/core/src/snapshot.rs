//! Per-request render results

use crate::key::PageKey;
use pdf_snapshot_render::{Bitmap, Document, Size};
use std::fmt;
use std::sync::Arc;

/// Lifecycle of a render job and of the snapshots it serves
///
/// `New -> Started -> Finished` or `New -> Started -> Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotState {
    /// Created, not yet executing
    New,
    /// A worker has begun rasterization
    Started,
    /// Bitmap produced and cached
    Finished,
    /// Rasterization produced no bitmap
    Failed,
}

impl SnapshotState {
    /// `Finished` and `Failed` are final
    pub fn is_terminal(self) -> bool {
        matches!(self, SnapshotState::Finished | SnapshotState::Failed)
    }

    /// Whether moving to `next` follows the lifecycle
    pub(crate) fn can_become(self, next: SnapshotState) -> bool {
        matches!(
            (self, next),
            (SnapshotState::New, SnapshotState::Started)
                | (SnapshotState::Started, SnapshotState::Finished)
                | (SnapshotState::Started, SnapshotState::Failed)
        )
    }
}

/// One requester's view of a page render
///
/// Every `fetch` gets its own snapshot, even when it shares a render with
/// other requests for the same page. The bitmap is set at most once.
#[derive(Clone)]
pub struct Snapshot {
    document: Arc<dyn Document>,
    page_index: usize,
    key: PageKey,
    target_size: Size,
    bitmap: Option<Arc<Bitmap>>,
    state: SnapshotState,
}

impl Snapshot {
    pub(crate) fn new(
        document: Arc<dyn Document>,
        page_index: usize,
        key: PageKey,
        target_size: Size,
    ) -> Self {
        Self {
            document,
            page_index,
            key,
            target_size,
            bitmap: None,
            state: SnapshotState::New,
        }
    }

    /// Move to a terminal state. Only the first call has any effect.
    pub(crate) fn resolve(&mut self, state: SnapshotState, bitmap: Option<Arc<Bitmap>>) {
        debug_assert!(state.is_terminal());
        if self.state.is_terminal() {
            return;
        }
        self.state = state;
        if state == SnapshotState::Finished {
            self.bitmap = bitmap;
        }
    }

    pub fn document(&self) -> &Arc<dyn Document> {
        &self.document
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn key(&self) -> &PageKey {
        &self.key
    }

    /// Size the caller asked to fit the page into
    pub fn target_size(&self) -> Size {
        self.target_size
    }

    /// The rendered bitmap; present only when `state()` is `Finished`
    pub fn bitmap(&self) -> Option<&Arc<Bitmap>> {
        self.bitmap.as_ref()
    }

    pub fn state(&self) -> SnapshotState {
        self.state
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("key", &self.key)
            .field("page_index", &self.page_index)
            .field("target_size", &self.target_size)
            .field("bitmap", &self.bitmap.as_ref().map(|b| b.dimensions()))
            .field("state", &self.state)
            .finish()
    }
}
