//! Rasterization: page content + target size + overlay -> bitmap
//!
//! The page is scaled uniformly to fit inside the target size, painted on an
//! opaque white background, and the overlay is painted last with the same
//! transform. Failures are reported as `None`; the reason goes to the log.

use crate::canvas::Canvas;
use crate::content::{DrawOp, PageContent};
use crate::error::{RenderError, RenderResult};
use crate::geometry::{Color, Size};
use image::RgbaImage;
use log::debug;

/// Rendered page bitmap (packed RGBA, 4 bytes per pixel)
pub type Bitmap = RgbaImage;

/// Default pixel budget for one bitmap (64 megapixels)
pub const DEFAULT_MAX_PIXELS: u64 = 64 * 1024 * 1024;

/// Turns page content into a bitmap
///
/// Implementations must be pure: no shared mutable state, callable from any
/// number of threads at once.
pub trait Rasterizer: Send + Sync {
    /// Render `content` (native size `native`) scaled to fit `target`,
    /// then composite `overlay` on top.
    ///
    /// Returns `None` on any failure.
    fn rasterize(
        &self,
        content: &PageContent,
        native: Size,
        target: Size,
        overlay: &[DrawOp],
    ) -> Option<Bitmap>;
}

/// Uniform scale that fits `native` inside `target`:
/// `min(target.w / native.w, target.h / native.h)`
pub fn fit_scale(native: Size, target: Size) -> RenderResult<f32> {
    if native.is_empty() || target.is_empty() {
        return Err(RenderError::EmptyGeometry { native, target });
    }
    Ok((target.width / native.width).min(target.height / native.height))
}

/// Pixel dimensions of the fitted bitmap (native size times the fit scale)
pub fn scaled_size(native: Size, target: Size) -> RenderResult<(u32, u32)> {
    let scaled = native.scaled(fit_scale(native, target)?);
    let to_px = |v: f32| v.round().clamp(1.0, u32::MAX as f32) as u32;
    Ok((to_px(scaled.width), to_px(scaled.height)))
}

/// Software rasterizer for [`PageContent`] display lists
#[derive(Debug, Clone, Copy)]
pub struct VectorRasterizer {
    max_pixels: u64,
}

impl Default for VectorRasterizer {
    fn default() -> Self {
        Self {
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

impl VectorRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse bitmaps with more than `max_pixels` pixels
    pub fn with_max_pixels(mut self, max_pixels: u64) -> Self {
        self.max_pixels = max_pixels;
        self
    }

    /// Like [`Rasterizer::rasterize`], but reports why rendering failed
    pub fn try_rasterize(
        &self,
        content: &PageContent,
        native: Size,
        target: Size,
        overlay: &[DrawOp],
    ) -> RenderResult<Bitmap> {
        let scale = fit_scale(native, target)?;
        let (width, height) = scaled_size(native, target)?;
        if width as u64 * height as u64 > self.max_pixels {
            return Err(RenderError::TooLarge { width, height });
        }

        let mut canvas = Canvas::new(width, height, scale)?;
        canvas.clear(Color::WHITE);
        canvas.draw_all(&content.ops);
        canvas.draw_all(overlay);
        canvas.into_bitmap()
    }
}

impl Rasterizer for VectorRasterizer {
    fn rasterize(
        &self,
        content: &PageContent,
        native: Size,
        target: Size,
        overlay: &[DrawOp],
    ) -> Option<Bitmap> {
        match self.try_rasterize(content, native, target, overlay) {
            Ok(bitmap) => Some(bitmap),
            Err(err) => {
                debug!("rasterization failed: {}", err);
                None
            }
        }
    }
}
