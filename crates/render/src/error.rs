//! Errors raised while rasterizing a page

use crate::geometry::Size;

/// Errors that can occur while producing a page bitmap
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    /// The document has no page at this index
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: usize, page_count: usize },

    /// Native or target geometry has no area
    #[error("cannot scale page of {native:?} into {target:?}")]
    EmptyGeometry { native: Size, target: Size },

    /// The scaled bitmap exceeds the rasterizer's pixel budget
    #[error("bitmap of {width}x{height} exceeds the pixel limit")]
    TooLarge { width: u32, height: u32 },

    /// The pixel buffer could not be allocated
    #[error("failed to allocate {bytes} bytes for bitmap")]
    Allocation { bytes: usize },
}

/// Result type for render operations
pub type RenderResult<T> = Result<T, RenderError>;
