//! PDF Snapshot Core Library
//!
//! On-demand page rendering for viewers: requests for page bitmaps are served
//! from a cost-bounded cache when possible, coalesced onto a single render
//! when the same page is already in flight, and otherwise rendered on a
//! bounded worker pool. Results are delivered on a caller-chosen context.
//!
//! # Example
//!
//! ```
//! use pdf_snapshot_core::{delivery_queue, RenderConfig, RenderDispatcher};
//! use pdf_snapshot_render::{MemoryDocument, Page, Size, VectorRasterizer};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let (queue, main_loop) = delivery_queue();
//! let dispatcher = RenderDispatcher::new(
//!     RenderConfig::default(),
//!     Arc::new(VectorRasterizer::new()),
//!     Arc::new(queue),
//! )
//! .unwrap();
//!
//! let document = Arc::new(MemoryDocument::new());
//! document.push_page(Page::blank(Size::new(200.0, 100.0)));
//!
//! dispatcher.fetch(document, 0, Size::new(100.0, 100.0), |snapshot| {
//!     let bitmap = snapshot.bitmap().expect("rendered");
//!     assert_eq!(bitmap.dimensions(), (100, 50));
//! });
//!
//! // The owning thread drains its delivery queue
//! assert!(main_loop.run_next(Duration::from_secs(5)));
//! ```

mod config;
mod delivery;
mod dispatcher;
mod error;
mod inflight;
mod job;
mod key;
mod snapshot;

pub use config::RenderConfig;
pub use delivery::{delivery_queue, DeliveryContext, DeliveryLoop, DeliveryQueue, Immediate};
pub use dispatcher::{DispatcherStats, RenderDispatcher};
pub use error::{ConfigError, DispatchError};
pub use key::PageKey;
pub use snapshot::{Snapshot, SnapshotState};

pub use pdf_snapshot_cache::{CacheStats, SnapshotCache};
pub use pdf_snapshot_render::Bitmap;
