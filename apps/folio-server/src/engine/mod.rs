//! Rendering engine and image encoder collaborators
//!
//! The session layer never talks to MuPDF or an image codec directly. It asks
//! a [`RenderEngine`] to decode documents and rasterize pages, and an
//! [`ImageEncoder`] to turn rasters (or error placeholders) into bytes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   open_document(bytes)   ┌────────────────────┐
//! │   GlobalState    │ ───────────────────────▶ │    RenderEngine    │
//! └──────────────────┘                          └────────────────────┘
//!          │ owns                                          │ returns
//!          ▼                                               ▼
//! ┌──────────────────┐        holds             ┌────────────────────┐
//! │  DocumentState   │ ───────────────────────▶ │ dyn EngineDocument │
//! └──────────────────┘                          └────────────────────┘
//!          │                                               │ render_page
//!          ▼                                               ▼
//! ┌──────────────────┐     encode_raster        ┌────────────────────┐
//! │   PageRenderer   │ ───────────────────────▶ │    ImageEncoder    │
//! └──────────────────┘                          └────────────────────┘
//! ```
//!
//! Closing a document is dropping its [`EngineDocument`].

mod encoder;
mod mupdf_backend;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

pub use self::encoder::{ImageCrateEncoder, ThumbnailFormat};
pub use self::mupdf_backend::MupdfEngine;

/// Decoded page raster, always RGBA8
pub type Raster = image::RgbaImage;

/// Page size in PDF points (72 points = 1 inch)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
}

impl PageGeometry {
    /// US Letter, used when a page reports no usable size
    pub const FALLBACK: PageGeometry = PageGeometry {
        width: 612.0,
        height: 792.0,
    };

    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Returns this geometry, or [`PageGeometry::FALLBACK`] if either side is
    /// zero, negative or not finite.
    pub fn or_fallback(self) -> Self {
        let usable = |v: f32| v.is_finite() && v > 0.0;
        if usable(self.width) && usable(self.height) {
            self
        } else {
            Self::FALLBACK
        }
    }

    /// Pixel dimensions at the given DPI, at least 1x1
    pub fn pixels_at(&self, dpi: f32) -> (u32, u32) {
        let scale = dpi / 72.0;
        let px = |points: f32| (points * scale).round().clamp(1.0, MAX_RASTER_SIDE as f32) as u32;
        (px(self.width), px(self.height))
    }
}

/// Upper bound on either raster side, in pixels
pub const MAX_RASTER_SIDE: u32 = 8192;

/// Errors reported by the rendering engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// The bytes could not be decoded as a document
    #[error("Failed to open document: {0}")]
    OpenFailed(String),

    /// The engine ran out of memory while rendering
    #[error("Out of memory")]
    OutOfMemory,

    /// Rendering completed but produced no pixels
    #[error("Render produced an empty buffer")]
    BufferEmpty,

    /// Page index outside the decoded document
    #[error("Page not found: index {0}")]
    PageNotFound(usize),

    /// Any other backend failure
    #[error("Engine error: {0}")]
    Backend(String),
}

/// Result type alias for engine operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Errors reported by the image encoder
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("PNG encoding failed: {0}")]
    Png(#[from] png::EncodingError),

    #[error("Invalid raster: {0}")]
    InvalidRaster(String),
}

/// Decodes documents for the session layer
pub trait RenderEngine: Send + Sync {
    /// Decode `bytes` into a live document handle.
    ///
    /// The bytes are shared with the owning `DocumentState`, so engines that
    /// re-open per operation can keep them without copying.
    fn open_document(&self, bytes: Arc<[u8]>) -> EngineResult<Box<dyn EngineDocument>>;
}

/// A decoded document. Dropping it closes the document.
pub trait EngineDocument: Send + Sync {
    /// Number of pages in the decoded document
    fn page_count(&self) -> usize;

    /// Size of the page at `index`, in points
    fn page_geometry(&self, index: usize) -> EngineResult<PageGeometry>;

    /// Rasterize the untransformed page at `index` at `dpi`
    fn render_page(&self, index: usize, dpi: f32) -> EngineResult<Raster>;
}

/// Produces image bytes for rasters and error placeholders
pub trait ImageEncoder: Send + Sync {
    /// MIME type of everything this encoder produces
    fn content_type(&self) -> &'static str;

    /// Encode a rendered page raster
    fn encode_raster(&self, raster: &Raster) -> Result<Vec<u8>, EncodeError>;

    /// Encode a placeholder image standing in for a page that failed to
    /// render. `geometry` is the page size in points, scaled by `dpi`.
    fn encode_error_placeholder(
        &self,
        message: &str,
        geometry: PageGeometry,
        dpi: f32,
    ) -> Result<Vec<u8>, EncodeError>;
}
