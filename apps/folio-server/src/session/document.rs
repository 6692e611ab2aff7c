//! Open document state
//!
//! A [`DocumentState`] owns the engine handle, the verbatim source bytes and
//! the page list in current display order. Pages are addressed by
//! `page_num`, never by position, so ids stay valid across reordering.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::engine::{EngineDocument, PageGeometry};

use super::page::PageState;
use super::page_id::PageId;

/// How a document entered the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentOrigin {
    /// Named on the command line at startup
    CliLoaded,
    /// Uploaded by a client
    Uploaded,
}

/// Display color used to tell documents apart in the page grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl DocumentColor {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Palette entry for a document id. Deterministic, and consecutive ids
    /// get different colors.
    pub fn for_document(doc_id: u32) -> Self {
        PALETTE[doc_id as usize % PALETTE.len()]
    }
}

impl fmt::Display for DocumentColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Serialize for DocumentColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

const PALETTE: [DocumentColor; 8] = [
    DocumentColor::rgb(0x4e, 0x79, 0xa7),
    DocumentColor::rgb(0xf2, 0x8e, 0x2b),
    DocumentColor::rgb(0xe1, 0x57, 0x59),
    DocumentColor::rgb(0x76, 0xb7, 0xb2),
    DocumentColor::rgb(0x59, 0xa1, 0x4f),
    DocumentColor::rgb(0xed, 0xc9, 0x48),
    DocumentColor::rgb(0xb0, 0x7a, 0xa1),
    DocumentColor::rgb(0x9c, 0x75, 0x5f),
];

pub struct DocumentState {
    id: u32,
    origin: DocumentOrigin,
    filepath: Option<PathBuf>,
    filename: String,
    handle: Box<dyn EngineDocument>,
    pages: Vec<PageState>,
    color: DocumentColor,
    modified: bool,
    original_bytes: Arc<[u8]>,
    content_hash: String,
    opened_at: DateTime<Utc>,
}

impl DocumentState {
    /// Build the state for a freshly decoded document. `geometries` holds one
    /// entry per engine page, in page order.
    pub(crate) fn new(
        id: u32,
        origin: DocumentOrigin,
        filepath: Option<PathBuf>,
        filename: String,
        handle: Box<dyn EngineDocument>,
        geometries: Vec<PageGeometry>,
        original_bytes: Arc<[u8]>,
    ) -> Self {
        let pages = geometries
            .into_iter()
            .enumerate()
            .map(|(index, geometry)| {
                let index = index as u32;
                PageState::new(PageId::new(id, index), index, geometry)
            })
            .collect();

        let content_hash = hex::encode(Sha256::digest(&original_bytes[..]));

        Self {
            id,
            origin,
            filepath,
            filename,
            handle,
            pages,
            color: DocumentColor::for_document(id),
            modified: false,
            original_bytes,
            content_hash,
            opened_at: Utc::now(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn origin(&self) -> DocumentOrigin {
        self.origin
    }

    pub fn filepath(&self) -> Option<&Path> {
        self.filepath.as_deref()
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn color(&self) -> DocumentColor {
        self.color
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub(crate) fn mark_modified(&mut self) {
        self.modified = true;
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    /// Hex SHA-256 of the original bytes
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// The bytes the document was opened from, unchanged
    pub fn original_bytes(&self) -> &Arc<[u8]> {
        &self.original_bytes
    }

    pub fn handle(&self) -> &dyn EngineDocument {
        &*self.handle
    }

    /// Pages in current display order, including soft-deleted ones
    pub fn pages(&self) -> &[PageState] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Pages in current order, skipping soft-deleted ones
    pub fn visible_pages(&self) -> impl Iterator<Item = &PageState> {
        self.pages.iter().filter(|page| !page.is_deleted())
    }

    pub fn page(&self, page_num: u32) -> Option<&PageState> {
        self.pages.iter().find(|page| page.id().page_num == page_num)
    }

    pub fn page_mut(&mut self, page_num: u32) -> Option<&mut PageState> {
        self.pages
            .iter_mut()
            .find(|page| page.id().page_num == page_num)
    }

    /// Mutable page plus the engine handle, for rendering into the page cache
    pub fn page_with_handle_mut(
        &mut self,
        page_num: u32,
    ) -> Option<(&mut PageState, &dyn EngineDocument)> {
        let handle = &*self.handle;
        let page = self
            .pages
            .iter_mut()
            .find(|page| page.id().page_num == page_num)?;
        Some((page, handle))
    }

    /// Move a page to `new_position` in display order. Positions past the end
    /// clamp to the last slot. Returns the final position.
    pub(crate) fn move_page(&mut self, page_num: u32, new_position: u32) -> Option<u32> {
        let from = self
            .pages
            .iter()
            .position(|page| page.id().page_num == page_num)?;

        let page = self.pages.remove(from);
        let to = (new_position as usize).min(self.pages.len());
        self.pages.insert(to, page);
        self.renumber();

        Some(to as u32)
    }

    /// Restore original order and clear every edit. Cached thumbnails stay,
    /// since they hold the unmodified source raster.
    pub(crate) fn revert(&mut self) {
        self.pages.sort_by_key(|page| page.original_index());
        for page in &mut self.pages {
            page.modifications = Default::default();
        }
        self.renumber();
        self.modified = false;
    }

    pub fn invalidate_thumbnails(&mut self) {
        for page in &mut self.pages {
            page.invalidate_cache();
        }
    }

    fn renumber(&mut self) {
        for (position, page) in self.pages.iter_mut().enumerate() {
            page.reorder_to(position as u32);
        }
    }
}

impl fmt::Debug for DocumentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentState")
            .field("id", &self.id)
            .field("origin", &self.origin)
            .field("filename", &self.filename)
            .field("pages", &self.pages.len())
            .field("modified", &self.modified)
            .field("bytes", &self.original_bytes.len())
            .finish_non_exhaustive()
    }
}
