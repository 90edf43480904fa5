//! Document model consumed by the render pipeline
//!
//! The pipeline only needs a stable identity, page geometry, page content and
//! an optional annotation overlay per page. Parsing real files is left to
//! whoever implements [`Document`].

use crate::content::{DrawOp, PageContent};
use crate::error::{RenderError, RenderResult};
use crate::geometry::Size;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// One page: native size in points plus its drawable content
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub size: Size,
    pub content: Arc<PageContent>,
}

impl Page {
    pub fn new(size: Size, content: PageContent) -> Self {
        Self {
            size,
            content: Arc::new(content),
        }
    }

    /// A page with no content
    pub fn blank(size: Size) -> Self {
        Self::new(size, PageContent::default())
    }
}

/// A paginated document as seen by the renderer
///
/// Implementations must be safe to read from render workers while the
/// owning thread holds its own handle.
pub trait Document: Send + Sync {
    /// Identity that is stable for the lifetime of the document and unique
    /// among open documents
    fn id(&self) -> &str;

    fn page_count(&self) -> usize;

    /// Page at `index`, or `None` when out of range
    fn page(&self, index: usize) -> Option<Page>;

    /// Overlay drawn on top of the page (annotations), in page coordinates
    fn annotations(&self, _index: usize) -> Vec<DrawOp> {
        Vec::new()
    }
}

/// In-memory document
///
/// Pages and annotations can be edited while renders are in flight; each
/// render sees the state at the moment it reads the page.
///
/// # Example
///
/// ```
/// use pdf_snapshot_render::{Document, MemoryDocument, Page, Size};
///
/// let doc = MemoryDocument::new();
/// doc.push_page(Page::blank(Size::new(612.0, 792.0)));
/// assert_eq!(doc.page_count(), 1);
/// ```
#[derive(Debug)]
pub struct MemoryDocument {
    id: String,
    pages: RwLock<Vec<Page>>,
    annotations: RwLock<HashMap<usize, Vec<DrawOp>>>,
}

impl MemoryDocument {
    /// Create an empty document with a random identity
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    /// Create an empty document with a caller-chosen identity
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            pages: RwLock::new(Vec::new()),
            annotations: RwLock::new(HashMap::new()),
        }
    }

    /// Create a document from a list of pages
    pub fn from_pages(pages: Vec<Page>) -> Self {
        let doc = Self::new();
        *doc.pages.write() = pages;
        doc
    }

    /// Append a page, returning its index
    pub fn push_page(&self, page: Page) -> usize {
        let mut pages = self.pages.write();
        pages.push(page);
        pages.len() - 1
    }

    /// Replace the page at `index`
    pub fn replace_page(&self, index: usize, page: Page) -> RenderResult<()> {
        let mut pages = self.pages.write();
        let page_count = pages.len();
        let slot = pages
            .get_mut(index)
            .ok_or(RenderError::PageOutOfRange { page: index, page_count })?;
        *slot = page;
        Ok(())
    }

    /// Remove the last page
    pub fn pop_page(&self) -> Option<Page> {
        self.pages.write().pop()
    }

    /// Add an overlay operation to a page
    pub fn add_annotation(&self, index: usize, op: DrawOp) {
        self.annotations.write().entry(index).or_default().push(op);
    }

    /// Drop all overlay operations of a page
    pub fn clear_annotations(&self, index: usize) {
        self.annotations.write().remove(&index);
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl Document for MemoryDocument {
    fn id(&self) -> &str {
        &self.id
    }

    fn page_count(&self) -> usize {
        self.pages.read().len()
    }

    fn page(&self, index: usize) -> Option<Page> {
        self.pages.read().get(index).cloned()
    }

    fn annotations(&self, index: usize) -> Vec<DrawOp> {
        self.annotations
            .read()
            .get(&index)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Color, Rect};

    fn letter() -> Page {
        Page::blank(Size::new(612.0, 792.0))
    }

    #[test]
    fn test_ids_are_unique() {
        let a = MemoryDocument::new();
        let b = MemoryDocument::new();
        assert_ne!(a.id(), b.id());
        assert_eq!(MemoryDocument::with_id("fixed").id(), "fixed");
    }

    #[test]
    fn test_pages() {
        let doc = MemoryDocument::new();
        assert_eq!(doc.push_page(letter()), 0);
        assert_eq!(doc.push_page(letter()), 1);

        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.page(1).map(|p| p.size), Some(Size::new(612.0, 792.0)));
        assert!(doc.page(2).is_none());
    }

    #[test]
    fn test_replace_page() {
        let doc = MemoryDocument::from_pages(vec![letter()]);
        doc.replace_page(0, Page::blank(Size::new(100.0, 100.0)))
            .unwrap();
        assert_eq!(doc.page(0).unwrap().size, Size::new(100.0, 100.0));

        let err = doc.replace_page(3, letter()).unwrap_err();
        assert_eq!(err, RenderError::PageOutOfRange { page: 3, page_count: 1 });
    }

    #[test]
    fn test_pop_page() {
        let doc = MemoryDocument::from_pages(vec![letter(), letter()]);
        assert!(doc.pop_page().is_some());
        assert_eq!(doc.page_count(), 1);
    }

    #[test]
    fn test_annotations() {
        let doc = MemoryDocument::from_pages(vec![letter()]);
        assert!(doc.annotations(0).is_empty());

        let highlight = DrawOp::FillRect {
            rect: Rect::new(10.0, 10.0, 50.0, 12.0),
            color: Color::rgba(255, 230, 0, 96),
        };
        doc.add_annotation(0, highlight.clone());
        assert_eq!(doc.annotations(0), vec![highlight]);

        doc.clear_annotations(0);
        assert!(doc.annotations(0).is_empty());
    }
}
