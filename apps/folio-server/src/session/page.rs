//! Per-page session state and thumbnail cache

use std::sync::Arc;

use crate::engine::PageGeometry;

use super::modification::PageModification;
use super::page_id::PageId;

/// A rendered thumbnail, or the placeholder that stands in for a page that
/// failed to render. Both variants always carry non-empty image bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Thumbnail {
    Rendered(Arc<[u8]>),
    Placeholder {
        bytes: Arc<[u8]>,
        message: &'static str,
    },
}

impl Thumbnail {
    pub fn bytes(&self) -> &Arc<[u8]> {
        match self {
            Thumbnail::Rendered(bytes) => bytes,
            Thumbnail::Placeholder { bytes, .. } => bytes,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Thumbnail::Placeholder { .. })
    }

    /// User-facing error message for placeholders
    pub fn error_message(&self) -> Option<&'static str> {
        match self {
            Thumbnail::Rendered(_) => None,
            Thumbnail::Placeholder { message, .. } => Some(*message),
        }
    }
}

/// One page of an open document.
///
/// `original_index` is the engine page index and never changes;
/// `current_index` follows reordering. The owning document is referenced
/// only through `id.doc_id`.
///
/// Edits go through [`GlobalState`](crate::session::GlobalState) so that the
/// document is marked modified and the change version moves:
///
/// ```compile_fail
/// # use folio_server::session::PageState;
/// fn edit_in_place(page: &mut PageState) {
///     page.modifications.mark_deleted();
/// }
/// ```
#[derive(Debug)]
pub struct PageState {
    id: PageId,
    original_index: u32,
    current_index: u32,
    pub(crate) modifications: PageModification,
    thumbnail_cache: Option<Thumbnail>,
    pub(crate) width: f32,
    pub(crate) height: f32,
}

impl PageState {
    pub(crate) fn new(id: PageId, index: u32, geometry: PageGeometry) -> Self {
        Self {
            id,
            original_index: index,
            current_index: index,
            modifications: PageModification::default(),
            thumbnail_cache: None,
            width: geometry.width,
            height: geometry.height,
        }
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn original_index(&self) -> u32 {
        self.original_index
    }

    pub fn current_index(&self) -> u32 {
        self.current_index
    }

    pub fn modifications(&self) -> PageModification {
        self.modifications
    }

    pub fn is_deleted(&self) -> bool {
        self.modifications.deleted
    }

    pub fn geometry(&self) -> PageGeometry {
        PageGeometry::new(self.width, self.height)
    }

    /// Size as displayed, with width and height swapped for sideways rotations
    pub fn display_size(&self) -> (f32, f32) {
        if self.modifications.rotation.is_sideways() {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }

    pub fn cached_thumbnail(&self) -> Option<&Thumbnail> {
        self.thumbnail_cache.as_ref()
    }

    pub fn is_cached(&self) -> bool {
        self.thumbnail_cache.is_some()
    }

    /// Drop the cached thumbnail. Safe to call on an empty cache.
    pub fn invalidate_cache(&mut self) {
        self.thumbnail_cache = None;
    }

    /// Fill an empty cache slot. A populated slot must be invalidated first,
    /// so a cached render never flips straight to a placeholder or back.
    pub(crate) fn store_thumbnail(&mut self, thumbnail: Thumbnail) {
        debug_assert!(self.thumbnail_cache.is_none(), "thumbnail cache already populated");
        if self.thumbnail_cache.is_none() {
            self.thumbnail_cache = Some(thumbnail);
        }
    }

    /// Move to a new position. Identity and modifications are untouched.
    pub(crate) fn reorder_to(&mut self, new_index: u32) {
        self.current_index = new_index;
    }
}
