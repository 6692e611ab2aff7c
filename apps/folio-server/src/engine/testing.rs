//! Call-counting fakes for the engine and encoder

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{
    EncodeError, EngineDocument, EngineError, EngineResult, ImageEncoder, PageGeometry, Raster,
    RenderEngine,
};

/// Single empty US Letter page that MuPDF can open
pub(crate) const MINIMAL_PDF: &[u8] = b"%PDF-1.4
1 0 obj
<< /Type /Catalog /Pages 2 0 R >>
endobj
2 0 obj
<< /Type /Pages /Kids [3 0 R] /Count 1 >>
endobj
3 0 obj
<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << >> >>
endobj
4 0 obj
<< /Length 0 >>
stream
endstream
endobj
xref
0 5
0000000000 65535 f
0000000009 00000 n
0000000058 00000 n
0000000115 00000 n
0000000226 00000 n
trailer
<< /Size 5 /Root 1 0 R >>
startxref
276
%%EOF";

/// Which error the fake engine returns from `render_page`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FakeFailure {
    OutOfMemory,
    BufferEmpty,
    PageNotFound,
    Backend,
}

impl FakeFailure {
    fn to_error(self, index: usize) -> EngineError {
        match self {
            FakeFailure::OutOfMemory => EngineError::OutOfMemory,
            FakeFailure::BufferEmpty => EngineError::BufferEmpty,
            FakeFailure::PageNotFound => EngineError::PageNotFound(index),
            FakeFailure::Backend => EngineError::Backend("fake backend failure".into()),
        }
    }
}

#[derive(Default)]
struct FakeEngineInner {
    pages: Mutex<Vec<PageGeometry>>,
    reject_open: AtomicBool,
    fail_geometry: AtomicBool,
    render_failure: Mutex<Option<FakeFailure>>,
    opened: AtomicUsize,
    live_handles: AtomicUsize,
    render_calls: AtomicUsize,
}

/// Fake engine. Every opened document has the configured pages.
#[derive(Clone)]
pub(crate) struct FakeEngine {
    inner: Arc<FakeEngineInner>,
}

impl FakeEngine {
    /// Engine whose documents have `pages` letter-sized pages
    pub(crate) fn with_pages(pages: usize) -> Self {
        let engine = Self {
            inner: Arc::new(FakeEngineInner::default()),
        };
        engine.set_pages(vec![PageGeometry::FALLBACK; pages]);
        engine
    }

    pub(crate) fn set_pages(&self, pages: Vec<PageGeometry>) {
        *self.inner.pages.lock() = pages;
    }

    pub(crate) fn reject_open(&self, reject: bool) {
        self.inner.reject_open.store(reject, Ordering::SeqCst);
    }

    pub(crate) fn fail_geometry(&self, fail: bool) {
        self.inner.fail_geometry.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_renders(&self, failure: Option<FakeFailure>) {
        *self.inner.render_failure.lock() = failure;
    }

    pub(crate) fn render_calls(&self) -> usize {
        self.inner.render_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn opened(&self) -> usize {
        self.inner.opened.load(Ordering::SeqCst)
    }

    pub(crate) fn live_handles(&self) -> usize {
        self.inner.live_handles.load(Ordering::SeqCst)
    }
}

impl RenderEngine for FakeEngine {
    fn open_document(&self, bytes: Arc<[u8]>) -> EngineResult<Box<dyn EngineDocument>> {
        if self.inner.reject_open.load(Ordering::SeqCst) {
            return Err(EngineError::OpenFailed("fake engine rejected bytes".into()));
        }
        self.inner.opened.fetch_add(1, Ordering::SeqCst);
        self.inner.live_handles.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeDocument {
            engine: Arc::clone(&self.inner),
            pages: self.inner.pages.lock().clone(),
            _bytes: bytes,
        }))
    }
}

struct FakeDocument {
    engine: Arc<FakeEngineInner>,
    pages: Vec<PageGeometry>,
    _bytes: Arc<[u8]>,
}

impl EngineDocument for FakeDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_geometry(&self, index: usize) -> EngineResult<PageGeometry> {
        if self.engine.fail_geometry.load(Ordering::SeqCst) {
            return Err(EngineError::Backend("fake geometry failure".into()));
        }
        self.pages
            .get(index)
            .copied()
            .ok_or(EngineError::PageNotFound(index))
    }

    fn render_page(&self, index: usize, dpi: f32) -> EngineResult<Raster> {
        self.engine.render_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = *self.engine.render_failure.lock() {
            return Err(failure.to_error(index));
        }
        let geometry = self
            .pages
            .get(index)
            .copied()
            .ok_or(EngineError::PageNotFound(index))?;
        let (width, height) = geometry.pixels_at(dpi);
        // Encode the page index in the red channel so renders are distinguishable
        Ok(Raster::from_pixel(
            width,
            height,
            image::Rgba([index as u8, 0, 0, 255]),
        ))
    }
}

impl Drop for FakeDocument {
    fn drop(&mut self) {
        self.engine.live_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Fake encoder producing readable byte strings
#[derive(Clone, Default)]
pub(crate) struct FakeEncoder {
    fail_rasters: Arc<AtomicBool>,
    fail_placeholders: Arc<AtomicBool>,
}

impl FakeEncoder {
    pub(crate) fn fail_rasters(&self, fail: bool) {
        self.fail_rasters.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_placeholders(&self, fail: bool) {
        self.fail_placeholders.store(fail, Ordering::SeqCst);
    }
}

impl ImageEncoder for FakeEncoder {
    fn content_type(&self) -> &'static str {
        "image/x-fake"
    }

    fn encode_raster(&self, raster: &Raster) -> Result<Vec<u8>, EncodeError> {
        if self.fail_rasters.load(Ordering::SeqCst) {
            return Err(EncodeError::InvalidRaster("fake encoder failure".into()));
        }
        let marker = raster.get_pixel(0, 0).0[0];
        Ok(format!("raster:{}x{}:{}", raster.width(), raster.height(), marker).into_bytes())
    }

    fn encode_error_placeholder(
        &self,
        message: &str,
        geometry: PageGeometry,
        dpi: f32,
    ) -> Result<Vec<u8>, EncodeError> {
        if self.fail_placeholders.load(Ordering::SeqCst) {
            return Err(EncodeError::InvalidRaster("fake placeholder failure".into()));
        }
        let (width, height) = geometry.or_fallback().pixels_at(dpi);
        Ok(format!("placeholder:{}x{}:{}", width, height, message).into_bytes())
    }
}
