//! JSON views of session state
//!
//! Built while the session lock is held and returned after it is released.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::session::{
    DocumentColor, DocumentOrigin, DocumentState, PageId, PageModification, PageState,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: u32,
    pub filename: String,
    pub origin: DocumentOrigin,
    pub color: DocumentColor,
    pub page_count: usize,
    pub visible_page_count: usize,
    pub modified: bool,
    pub size_bytes: usize,
    pub opened_at: DateTime<Utc>,
}

impl From<&DocumentState> for DocumentSummary {
    fn from(doc: &DocumentState) -> Self {
        Self {
            id: doc.id(),
            filename: doc.filename().to_string(),
            origin: doc.origin(),
            color: doc.color(),
            page_count: doc.page_count(),
            visible_page_count: doc.visible_pages().count(),
            modified: doc.is_modified(),
            size_bytes: doc.original_bytes().len(),
            opened_at: doc.opened_at(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDetail {
    #[serde(flatten)]
    pub summary: DocumentSummary,
    pub content_hash: String,
    /// All pages in display order, soft-deleted ones included
    pub pages: Vec<PageView>,
}

impl From<&DocumentState> for DocumentDetail {
    fn from(doc: &DocumentState) -> Self {
        Self {
            summary: DocumentSummary::from(doc),
            content_hash: doc.content_hash().to_string(),
            pages: doc.pages().iter().map(PageView::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    pub id: PageId,
    pub original_index: u32,
    pub current_index: u32,
    pub modifications: PageModification,
    pub description: String,
    pub width: f32,
    pub height: f32,
    pub display_width: f32,
    pub display_height: f32,
    pub thumbnail_cached: bool,
}

impl From<&PageState> for PageView {
    fn from(page: &PageState) -> Self {
        let (display_width, display_height) = page.display_size();
        Self {
            id: page.id(),
            original_index: page.original_index(),
            current_index: page.current_index(),
            modifications: page.modifications(),
            description: page.modifications().describe(),
            width: page.width,
            height: page.height,
            display_width,
            display_height,
            thumbnail_cached: page.is_cached(),
        }
    }
}
