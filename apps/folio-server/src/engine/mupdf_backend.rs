//! MuPDF-backed rendering engine
//!
//! MuPDF documents are not thread-safe. [`MupdfDocument`] keeps the shared
//! source bytes, opens a fresh `mupdf::Document` for each render, and
//! serializes those renders through a `parking_lot::Mutex`. Page sizes are
//! read once at open time so geometry lookups never touch MuPDF again.

use std::sync::Arc;

use ::mupdf::{Colorspace, Document, Matrix};
use parking_lot::Mutex;

use super::{EngineDocument, EngineError, EngineResult, PageGeometry, Raster, RenderEngine};

const PDF_MIME: &str = "application/pdf";

impl From<::mupdf::Error> for EngineError {
    fn from(err: ::mupdf::Error) -> Self {
        let message = err.to_string();
        if message.to_ascii_lowercase().contains("out of memory") {
            EngineError::OutOfMemory
        } else {
            EngineError::Backend(message)
        }
    }
}

/// Production engine decoding PDFs with MuPDF
#[derive(Debug, Default, Clone, Copy)]
pub struct MupdfEngine;

impl MupdfEngine {
    pub fn new() -> Self {
        Self
    }
}

impl RenderEngine for MupdfEngine {
    fn open_document(&self, bytes: Arc<[u8]>) -> EngineResult<Box<dyn EngineDocument>> {
        if !bytes.starts_with(b"%PDF") {
            return Err(EngineError::OpenFailed("missing %PDF header".into()));
        }

        let doc = Document::from_bytes(&bytes[..], PDF_MIME)
            .map_err(|e| EngineError::OpenFailed(e.to_string()))?;
        let page_count = doc
            .page_count()
            .map_err(|e| EngineError::OpenFailed(e.to_string()))?
            .max(0) as usize;

        let mut geometries = Vec::with_capacity(page_count);
        for index in 0..page_count {
            let page = doc.load_page(index as i32)?;
            let bounds = page.bounds()?;
            geometries.push(PageGeometry::new(
                bounds.x1 - bounds.x0,
                bounds.y1 - bounds.y0,
            ));
        }

        Ok(Box::new(MupdfDocument {
            source: bytes,
            geometries,
            lock: Mutex::new(()),
        }))
    }
}

/// Decoded PDF handle
struct MupdfDocument {
    source: Arc<[u8]>,
    geometries: Vec<PageGeometry>,
    lock: Mutex<()>,
}

// SAFETY: MupdfDocument holds no MuPDF objects between calls. The source
// bytes and geometries are immutable after construction, and every MuPDF
// document opened in `render_page` is created, used and dropped while
// `lock` is held on a single thread.
unsafe impl Send for MupdfDocument {}
unsafe impl Sync for MupdfDocument {}

impl EngineDocument for MupdfDocument {
    fn page_count(&self) -> usize {
        self.geometries.len()
    }

    fn page_geometry(&self, index: usize) -> EngineResult<PageGeometry> {
        self.geometries
            .get(index)
            .copied()
            .ok_or(EngineError::PageNotFound(index))
    }

    fn render_page(&self, index: usize, dpi: f32) -> EngineResult<Raster> {
        if index >= self.geometries.len() {
            return Err(EngineError::PageNotFound(index));
        }

        let _guard = self.lock.lock();
        let doc = Document::from_bytes(&self.source[..], PDF_MIME)?;
        let page = doc.load_page(index as i32)?;

        let scale = (dpi / 72.0).clamp(0.01, 16.0);
        let matrix = Matrix::new_scale(scale, scale);
        let colorspace = Colorspace::device_rgb();
        let pixmap = page.to_pixmap(&matrix, &colorspace, true, true)?;

        pixmap_to_raster(&pixmap)
    }
}

fn pixmap_to_raster(pixmap: &::mupdf::Pixmap) -> EngineResult<Raster> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    if width == 0 || height == 0 {
        return Err(EngineError::BufferEmpty);
    }

    let samples = pixmap.samples();
    let n = pixmap.n() as usize;
    if samples.is_empty() || n < 3 {
        return Err(EngineError::BufferEmpty);
    }

    let mut rgba = Vec::new();
    rgba.try_reserve_exact(width as usize * height as usize * 4)
        .map_err(|_| EngineError::OutOfMemory)?;

    for y in 0..height as usize {
        for x in 0..width as usize {
            let offset = (y * width as usize + x) * n;
            let r = samples.get(offset).copied().unwrap_or(0);
            let g = samples.get(offset + 1).copied().unwrap_or(0);
            let b = samples.get(offset + 2).copied().unwrap_or(0);
            let a = if n >= 4 {
                samples.get(offset + 3).copied().unwrap_or(255)
            } else {
                255
            };
            rgba.extend_from_slice(&[r, g, b, a]);
        }
    }

    Raster::from_raw(width, height, rgba).ok_or(EngineError::BufferEmpty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::MINIMAL_PDF;

    #[test]
    fn test_rejects_non_pdf_bytes() {
        let engine = MupdfEngine::new();
        let bytes: Arc<[u8]> = Arc::from(&b"PK\x03\x04 not a pdf"[..]);
        let err = engine.open_document(bytes).err();
        assert!(matches!(err, Some(EngineError::OpenFailed(_))));
    }

    #[test]
    fn test_rejects_empty_bytes() {
        let engine = MupdfEngine::new();
        let bytes: Arc<[u8]> = Arc::from(Vec::new());
        assert!(engine.open_document(bytes).is_err());
    }

    fn open_minimal() -> Box<dyn EngineDocument> {
        MupdfEngine::new()
            .open_document(Arc::from(MINIMAL_PDF))
            .expect("minimal PDF opens")
    }

    #[test]
    fn test_open_reads_page_geometry() {
        let doc = open_minimal();
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.page_geometry(0).unwrap(), PageGeometry::new(612.0, 792.0));
        assert!(matches!(
            doc.page_geometry(1),
            Err(EngineError::PageNotFound(1))
        ));
    }

    #[test]
    fn test_render_at_72_dpi_matches_page_points() {
        let doc = open_minimal();
        let raster = doc.render_page(0, 72.0).unwrap();
        assert_eq!(raster.dimensions(), (612, 792));
        assert_eq!(raster.as_raw().len(), 612 * 792 * 4);
    }

    #[test]
    fn test_render_scales_with_dpi() {
        let doc = open_minimal();
        let raster = doc.render_page(0, 36.0).unwrap();
        assert_eq!(raster.dimensions(), (306, 396));
    }

    #[test]
    fn test_render_out_of_range_page() {
        let doc = open_minimal();
        assert!(matches!(
            doc.render_page(5, 72.0),
            Err(EngineError::PageNotFound(5))
        ));
    }

    #[test]
    fn test_session_thumbnail_through_mupdf() {
        use crate::engine::{ImageCrateEncoder, ThumbnailFormat};
        use crate::render::PageRenderer;
        use crate::session::{GlobalState, SessionConfig};

        let state = GlobalState::new(Arc::new(MupdfEngine::new()), SessionConfig::default());
        let id = state
            .add_document_from_bytes("minimal.pdf", MINIMAL_PDF.to_vec())
            .unwrap();
        let renderer = PageRenderer::new(Arc::new(ImageCrateEncoder::new(ThumbnailFormat::Png)));

        let mut session = state.lock();
        let dpi = session.thumbnail_dpi();
        let (page, handle) = session
            .get_document_mut(id)
            .and_then(|doc| doc.page_with_handle_mut(0))
            .unwrap();
        let thumbnail = renderer.render_thumbnail(page, handle, dpi);

        assert!(!thumbnail.is_placeholder());
        let decoded = image::load_from_memory(thumbnail.bytes()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (425, 550));
    }
}
