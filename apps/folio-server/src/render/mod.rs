//! Page rendering with per-page thumbnail caching
//!
//! [`PageRenderer`] never fails. A page the engine cannot render becomes a
//! placeholder image carrying a short user-facing message, and that
//! placeholder is cached like a real thumbnail so a permanently broken page
//! is not retried on every request.
//!
//! Thumbnails are always the unrotated, unmirrored source raster. Clients
//! apply the page's [`PageModification`](crate::session::PageModification)
//! visually, so edits never invalidate the cache. Anything that does make a
//! cached thumbnail stale (a DPI change, new content) must call
//! [`PageState::invalidate_cache`] explicitly.

use std::sync::Arc;

use thiserror::Error;

use crate::engine::{EncodeError, EngineDocument, EngineError, ImageEncoder, PageGeometry};
use crate::session::{DocumentState, PageState, Thumbnail};

pub const MSG_OUT_OF_MEMORY: &str = "Error: Out of Memory";
pub const MSG_RENDER_FAILED: &str = "Error: Render Failed";
pub const MSG_PAGE_NOT_FOUND: &str = "Error: Page Not Found";
pub const MSG_RENDERING_FAILED: &str = "Error: Rendering Failed";

/// 1x1 transparent PNG, served when even the placeholder cannot be encoded
const FALLBACK_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// Why a render fell back to a placeholder
#[derive(Debug, Error)]
pub enum RenderFailure {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

impl RenderFailure {
    /// The fixed message shown to users in place of the page
    pub fn user_message(&self) -> &'static str {
        match self {
            RenderFailure::Engine(EngineError::OutOfMemory) => MSG_OUT_OF_MEMORY,
            RenderFailure::Engine(EngineError::BufferEmpty) => MSG_RENDER_FAILED,
            RenderFailure::Engine(EngineError::PageNotFound(_)) => MSG_PAGE_NOT_FOUND,
            _ => MSG_RENDERING_FAILED,
        }
    }
}

/// Turns pages into image bytes through the engine and encoder
#[derive(Clone)]
pub struct PageRenderer {
    encoder: Arc<dyn ImageEncoder>,
}

impl PageRenderer {
    pub fn new(encoder: Arc<dyn ImageEncoder>) -> Self {
        Self { encoder }
    }

    /// MIME type of rendered and placeholder bytes
    pub fn content_type(&self) -> &'static str {
        self.encoder.content_type()
    }

    /// Cached thumbnail for `page`, rendering on a miss.
    ///
    /// `document` is the engine handle of the page's owning document. Callers
    /// hold the session lock for the whole call.
    pub fn render_thumbnail(
        &self,
        page: &mut PageState,
        document: &dyn EngineDocument,
        dpi: f32,
    ) -> Thumbnail {
        if let Some(cached) = page.cached_thumbnail() {
            return cached.clone();
        }

        let thumbnail = self.render(
            document,
            page.original_index() as usize,
            page.geometry(),
            dpi,
        );
        if let Thumbnail::Placeholder { message, .. } = &thumbnail {
            tracing::debug!(page = %page.id(), reason = *message, "Caching error placeholder");
        }
        page.store_thumbnail(thumbnail.clone());
        thumbnail
    }

    /// Render engine page `page_index` without touching any cache.
    /// Used for large, rarely requested output such as export previews.
    pub fn render_full_size(
        &self,
        document: &DocumentState,
        page_index: u32,
        dpi: f32,
    ) -> Thumbnail {
        let geometry = document
            .page(page_index)
            .map(PageState::geometry)
            .unwrap_or(PageGeometry::FALLBACK);

        self.render(document.handle(), page_index as usize, geometry, dpi)
    }

    fn render(
        &self,
        document: &dyn EngineDocument,
        index: usize,
        geometry: PageGeometry,
        dpi: f32,
    ) -> Thumbnail {
        match self.try_render(document, index, dpi) {
            Ok(bytes) => Thumbnail::Rendered(Arc::from(bytes)),
            Err(failure) => {
                let message = failure.user_message();
                tracing::warn!(
                    page_index = index,
                    dpi,
                    error = %failure,
                    "Render failed, serving placeholder: {}",
                    message
                );
                Thumbnail::Placeholder {
                    bytes: self.placeholder(message, geometry, dpi),
                    message,
                }
            }
        }
    }

    fn try_render(
        &self,
        document: &dyn EngineDocument,
        index: usize,
        dpi: f32,
    ) -> Result<Vec<u8>, RenderFailure> {
        let raster = document.render_page(index, dpi)?;
        if raster.width() == 0 || raster.height() == 0 {
            return Err(EngineError::BufferEmpty.into());
        }

        let bytes = self.encoder.encode_raster(&raster)?;
        if bytes.is_empty() {
            return Err(EngineError::BufferEmpty.into());
        }
        Ok(bytes)
    }

    fn placeholder(&self, message: &str, geometry: PageGeometry, dpi: f32) -> Arc<[u8]> {
        match self
            .encoder
            .encode_error_placeholder(message, geometry.or_fallback(), dpi)
        {
            Ok(bytes) if !bytes.is_empty() => Arc::from(bytes),
            Ok(_) => {
                tracing::error!("Placeholder encoder returned no bytes");
                Arc::from(FALLBACK_PNG)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode error placeholder");
                Arc::from(FALLBACK_PNG)
            }
        }
    }
}
