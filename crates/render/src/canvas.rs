//! Drawing surface that paints display-list operations into a pixmap
//!
//! Page coordinates are mapped to pixels by one uniform scale transform, so
//! page content and its overlay share the same coordinate space.

use crate::content::DrawOp;
use crate::error::{RenderError, RenderResult};
use crate::geometry::{Color, Point, Rect};
use image::RgbaImage;
use tiny_skia::{Paint, PathBuilder, Pixmap, Stroke, Transform};

/// Drawing surface over a `tiny_skia` pixmap
pub struct Canvas {
    pixmap: Pixmap,
    transform: Transform,
}

impl Canvas {
    /// Allocate a transparent `width` x `height` surface; `scale` converts
    /// page points to pixels
    pub fn new(width: u32, height: u32, scale: f32) -> RenderResult<Self> {
        let pixmap = Pixmap::new(width, height).ok_or(RenderError::Allocation {
            bytes: width as usize * height as usize * 4,
        })?;
        Ok(Self {
            pixmap,
            transform: Transform::from_scale(scale, scale),
        })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Fill the whole surface, ignoring the transform
    pub fn clear(&mut self, color: Color) {
        self.pixmap.fill(tiny_skia::Color::from_rgba8(
            color.r, color.g, color.b, color.a,
        ));
    }

    /// Paint one operation
    pub fn draw(&mut self, op: &DrawOp) {
        match *op {
            DrawOp::FillRect { rect, color } => self.fill_rect(rect, color),
            DrawOp::StrokeRect { rect, color, width } => self.stroke_rect(rect, color, width),
            DrawOp::Line {
                from,
                to,
                color,
                width,
            } => self.line(from, to, color, width),
        }
    }

    /// Paint a sequence of operations in order
    pub fn draw_all<'o>(&mut self, ops: impl IntoIterator<Item = &'o DrawOp>) {
        for op in ops {
            self.draw(op);
        }
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        // Degenerate rectangles draw nothing
        let Some(rect) = tiny_skia::Rect::from_xywh(rect.x, rect.y, rect.width, rect.height)
        else {
            return;
        };
        self.pixmap
            .fill_rect(rect, &paint(color), self.transform, None);
    }

    /// Outline a rectangle; the stroke lies inside the rectangle
    pub fn stroke_rect(&mut self, rect: Rect, color: Color, width: f32) {
        let w = width.max(0.0).min(rect.width / 2.0).min(rect.height / 2.0);
        if w <= 0.0 {
            return;
        }
        let half = w / 2.0;
        let Some(inset) = tiny_skia::Rect::from_xywh(
            rect.x + half,
            rect.y + half,
            rect.width - w,
            rect.height - w,
        ) else {
            // Stroke covers the whole rectangle
            self.fill_rect(rect, color);
            return;
        };

        let path = PathBuilder::from_rect(inset);
        self.pixmap.stroke_path(
            &path,
            &paint(color),
            &stroke(w),
            self.transform,
            None,
        );
    }

    /// Straight segment; zero width draws a one-pixel hairline
    pub fn line(&mut self, from: Point, to: Point, color: Color, width: f32) {
        let mut builder = PathBuilder::new();
        builder.move_to(from.x, from.y);
        builder.line_to(to.x, to.y);
        let Some(path) = builder.finish() else {
            return;
        };
        self.pixmap.stroke_path(
            &path,
            &paint(color),
            &stroke(width.max(0.0)),
            self.transform,
            None,
        );
    }

    /// Convert to a straight-alpha RGBA bitmap
    pub fn into_bitmap(self) -> RenderResult<RgbaImage> {
        let (width, height) = (self.pixmap.width(), self.pixmap.height());
        let mut data = Vec::new();
        data.try_reserve_exact(self.pixmap.data().len())
            .map_err(|_| RenderError::Allocation {
                bytes: self.pixmap.data().len(),
            })?;
        for pixel in self.pixmap.pixels() {
            let c = pixel.demultiply();
            data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        RgbaImage::from_raw(width, height, data).ok_or(RenderError::Allocation {
            bytes: width as usize * height as usize * 4,
        })
    }
}

fn paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, color.a);
    paint.anti_alias = true;
    paint
}

fn stroke(width: f32) -> Stroke {
    Stroke {
        width,
        ..Stroke::default()
    }
}
