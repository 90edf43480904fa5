//! Page content as a display list
//!
//! The core never interprets page content itself; it only hands it to a
//! rasterizer. This display list is the form the bundled vector rasterizer
//! understands. Coordinates are page points with the origin at the top-left.

use crate::geometry::{Color, Point, Rect};

/// One drawing operation in page coordinates
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Fill a rectangle
    FillRect { rect: Rect, color: Color },

    /// Outline a rectangle; the stroke lies inside the rectangle
    StrokeRect { rect: Rect, color: Color, width: f32 },

    /// Straight line segment
    Line {
        from: Point,
        to: Point,
        color: Color,
        width: f32,
    },
}

/// The drawable content of one page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageContent {
    pub ops: Vec<DrawOp>,
}

impl PageContent {
    pub fn new(ops: Vec<DrawOp>) -> Self {
        Self { ops }
    }

    /// Append an operation
    pub fn push(&mut self, op: DrawOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl FromIterator<DrawOp> for PageContent {
    fn from_iter<I: IntoIterator<Item = DrawOp>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
