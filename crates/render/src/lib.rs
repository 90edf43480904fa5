//! PDF Snapshot Render Library
//!
//! Page model and the rasterization step: turning one page's content plus its
//! annotation overlay into a bitmap scaled to fit a target size.

pub mod canvas;
pub mod content;
pub mod document;
pub mod error;
pub mod geometry;
pub mod raster;

pub use canvas::Canvas;
pub use content::{DrawOp, PageContent};
pub use document::{Document, MemoryDocument, Page};
pub use error::{RenderError, RenderResult};
pub use geometry::{Color, Point, Rect, Size};
pub use raster::{fit_scale, scaled_size, Bitmap, Rasterizer, VectorRasterizer};
