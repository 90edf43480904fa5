//! PDF Snapshot Cache Library
//!
//! Bitmap cache bounded by both entry count and total byte cost, with LRU eviction.

pub mod config;
pub mod ram;

pub use config::CacheLimits;
pub use ram::{CacheStats, Raster, SnapshotCache};
