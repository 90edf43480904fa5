//! Page identity used for caching and de-duplication

use pdf_snapshot_render::Document;
use std::fmt;

/// Identity of one page of one document
///
/// Rendered as `"{document id}_{page index}"`. The page index never contains
/// an underscore, so splitting at the last `_` recovers both parts and two
/// distinct (document, page) pairs never share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageKey(String);

impl PageKey {
    pub fn new(document_id: &str, page_index: usize) -> Self {
        Self(format!("{}_{}", document_id, page_index))
    }

    /// Key for a page of `document`
    pub fn for_page(document: &dyn Document, page_index: usize) -> Self {
        Self::new(document.id(), page_index)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split back into document id and page index
    pub fn parts(&self) -> Option<(&str, usize)> {
        let (document_id, page) = self.0.rsplit_once('_')?;
        Some((document_id, page.parse().ok()?))
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf_snapshot_render::MemoryDocument;

    #[test]
    fn test_key_format() {
        assert_eq!(PageKey::new("doc", 3).as_str(), "doc_3");
        assert_eq!(PageKey::new("doc", 3).to_string(), "doc_3");
    }

    #[test]
    fn test_key_is_deterministic() {
        assert_eq!(PageKey::new("a", 1), PageKey::new("a", 1));
        assert_ne!(PageKey::new("a", 1), PageKey::new("a", 2));
        assert_ne!(PageKey::new("a", 1), PageKey::new("b", 1));
    }

    #[test]
    fn test_underscored_ids_do_not_collide() {
        let a = PageKey::new("doc_1", 2);
        let b = PageKey::new("doc", 12);
        assert_ne!(a, b);
        assert_eq!(a.parts(), Some(("doc_1", 2)));
        assert_eq!(b.parts(), Some(("doc", 12)));
    }

    #[test]
    fn test_for_page() {
        let doc = MemoryDocument::with_id("report");
        assert_eq!(PageKey::for_page(&doc, 0), PageKey::new("report", 0));
    }
}
