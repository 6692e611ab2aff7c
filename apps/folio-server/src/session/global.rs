//! Process-wide session registry
//!
//! # Locking
//!
//! Every document, page and thumbnail cache sits behind one coarse
//! `parking_lot::Mutex`. A lookup-then-mutate sequence must hold a single
//! [`SessionGuard`] for the whole sequence. This serializes edits across
//! documents, which is fine for one user with a few tabs open; sharding the
//! lock per document is the way out if that stops being true.
//!
//! The change version is an `AtomicU64` outside the lock. Polling clients
//! read it without contending with writers, and `notify_change` never takes
//! the lock.
//!
//! Rendering a cache miss calls into the engine with the lock held, so a slow
//! render delays every other session operation until it finishes.

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use tokio::sync::Notify;

use crate::engine::{PageGeometry, RenderEngine};

use super::document::{DocumentOrigin, DocumentState};
use super::error::SessionError;
use super::modification::{MirrorAxis, PageModification, Rotation};
use super::page::PageState;
use super::page_id::PageId;

/// Default thumbnail resolution
pub const DEFAULT_THUMBNAIL_DPI: f32 = 50.0;

/// Session-level settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub thumbnail_dpi: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            thumbnail_dpi: DEFAULT_THUMBNAIL_DPI,
        }
    }
}

/// Everything guarded by the coarse lock
#[derive(Debug)]
pub struct Registry {
    documents: Vec<DocumentState>,
    next_doc_id: u32,
    thumbnail_dpi: f32,
}

impl Registry {
    fn new(config: &SessionConfig) -> Self {
        Self {
            documents: Vec::new(),
            next_doc_id: 1,
            thumbnail_dpi: config.thumbnail_dpi,
        }
    }

    /// Open documents in registration order
    pub fn documents(&self) -> &[DocumentState] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn thumbnail_dpi(&self) -> f32 {
        self.thumbnail_dpi
    }

    /// `None` for ids that were never issued or were already removed
    pub fn get_document(&self, id: u32) -> Option<&DocumentState> {
        self.documents.iter().find(|doc| doc.id() == id)
    }

    pub fn get_document_mut(&mut self, id: u32) -> Option<&mut DocumentState> {
        self.documents.iter_mut().find(|doc| doc.id() == id)
    }

    pub fn get_page(&self, id: PageId) -> Option<&PageState> {
        self.get_document(id.doc_id)?.page(id.page_num)
    }

    pub fn get_page_mut(&mut self, id: PageId) -> Option<&mut PageState> {
        self.get_document_mut(id.doc_id)?.page_mut(id.page_num)
    }

    fn allocate_id(&mut self) -> Result<u32, SessionError> {
        let id = self.next_doc_id;
        self.next_doc_id = id.checked_add(1).ok_or(SessionError::IdsExhausted)?;
        Ok(id)
    }
}

/// A committed mutation's result and the change version its commit produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Committed<T> {
    pub value: T,
    pub version: u64,
}

/// Exclusive access to the registry. Dropping the guard releases the lock.
pub struct SessionGuard<'a> {
    registry: MutexGuard<'a, Registry>,
    state: &'a GlobalState,
}

impl SessionGuard<'_> {
    /// Release the lock, then bump the change version
    pub fn commit(self) -> u64 {
        let state = self.state;
        drop(self);
        state.notify_change()
    }
}

impl Deref for SessionGuard<'_> {
    type Target = Registry;

    fn deref(&self) -> &Registry {
        &self.registry
    }
}

impl DerefMut for SessionGuard<'_> {
    fn deref_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }
}

/// The single registry of open documents, shared by every request handler
pub struct GlobalState {
    registry: Mutex<Registry>,
    change_version: AtomicU64,
    changed: Notify,
    engine: Arc<dyn RenderEngine>,
}

impl GlobalState {
    pub fn new(engine: Arc<dyn RenderEngine>, config: SessionConfig) -> Self {
        Self {
            registry: Mutex::new(Registry::new(&config)),
            change_version: AtomicU64::new(0),
            changed: Notify::new(),
            engine,
        }
    }

    /// Acquire the coarse lock
    pub fn lock(&self) -> SessionGuard<'_> {
        SessionGuard {
            registry: self.registry.lock(),
            state: self,
        }
    }

    /// Current change version. Lock-free.
    pub fn change_version(&self) -> u64 {
        self.change_version.load(Ordering::Acquire)
    }

    /// Record one committed mutation and wake long-polling clients.
    /// Lock-free; returns the new version.
    pub fn notify_change(&self) -> u64 {
        let version = self.change_version.fetch_add(1, Ordering::AcqRel) + 1;
        self.changed.notify_waiters();
        version
    }

    /// Wait until the version moves past `since`, or `timeout` elapses.
    /// Returns the version observed last.
    pub async fn wait_for_change(&self, since: u64, timeout: Duration) -> u64 {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            // Register before checking so a bump in between is not missed
            notified.as_mut().enable();

            let current = self.change_version();
            if current > since {
                return current;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.change_version();
            }
        }
    }

    /// Load a PDF named on the command line
    pub fn add_document_from_path(&self, path: impl AsRef<Path>) -> Result<u32, SessionError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| SessionError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        self.register(
            DocumentOrigin::CliLoaded,
            Some(path.to_path_buf()),
            filename,
            Arc::from(bytes),
        )
    }

    /// Register an uploaded PDF
    pub fn add_document_from_bytes(
        &self,
        filename: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Result<u32, SessionError> {
        self.register(DocumentOrigin::Uploaded, None, filename.into(), bytes.into())
    }

    /// Decode outside the lock, then publish. A failure at any step leaves
    /// nothing registered; the engine handle is closed by drop.
    fn register(
        &self,
        origin: DocumentOrigin,
        filepath: Option<PathBuf>,
        filename: String,
        bytes: Arc<[u8]>,
    ) -> Result<u32, SessionError> {
        let open_failed = |source| SessionError::OpenFailed {
            filename: filename.clone(),
            source,
        };

        let handle = match self.engine.open_document(Arc::clone(&bytes)) {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(filename = %filename, error = %e, "Rejected document");
                return Err(open_failed(e));
            }
        };

        let geometries = (0..handle.page_count())
            .map(|index| handle.page_geometry(index))
            .collect::<Result<Vec<PageGeometry>, _>>()
            .map_err(|e| {
                tracing::warn!(filename = %filename, error = %e, "Failed to read page geometry");
                open_failed(e)
            })?;

        let page_count = geometries.len();
        let byte_len = bytes.len();

        let mut session = self.lock();
        let id = session.allocate_id()?;
        let document =
            DocumentState::new(id, origin, filepath, filename, handle, geometries, bytes);
        tracing::info!(
            doc_id = id,
            filename = %document.filename(),
            origin = ?origin,
            pages = page_count,
            bytes = byte_len,
            "Registered document"
        );
        session.documents.push(document);
        session.commit();

        Ok(id)
    }

    /// Close a document and free its buffers. `false` if the id is unknown.
    pub fn remove_document(&self, id: u32) -> bool {
        let mut session = self.lock();
        let Some(position) = session.documents.iter().position(|doc| doc.id() == id) else {
            return false;
        };
        let document = session.documents.remove(position);
        session.commit();

        tracing::info!(doc_id = id, filename = %document.filename(), "Removed document");
        true
    }

    /// Lock, apply `edit` to one page, mark its document modified, commit.
    /// Stale ids return `None` and leave the version alone.
    fn edit_page<R>(
        &self,
        id: PageId,
        edit: impl FnOnce(&mut PageState) -> R,
    ) -> Option<Committed<R>> {
        let mut session = self.lock();
        let document = session.get_document_mut(id.doc_id)?;
        let value = edit(document.page_mut(id.page_num)?);
        document.mark_modified();
        let version = session.commit();
        Some(Committed { value, version })
    }

    pub fn rotate_page(
        &self,
        id: PageId,
        delta: Rotation,
    ) -> Option<Committed<PageModification>> {
        self.edit_page(id, |page| {
            page.modifications = page.modifications.apply_rotation(delta);
            page.modifications
        })
    }

    pub fn mirror_page(
        &self,
        id: PageId,
        axis: MirrorAxis,
    ) -> Option<Committed<PageModification>> {
        self.edit_page(id, |page| {
            page.modifications.toggle_mirror(axis);
            page.modifications
        })
    }

    /// Soft-delete or restore a page
    pub fn set_page_deleted(
        &self,
        id: PageId,
        deleted: bool,
    ) -> Option<Committed<PageModification>> {
        self.edit_page(id, |page| {
            if deleted {
                page.modifications.mark_deleted();
            } else {
                page.modifications.unmark_deleted();
            }
            page.modifications
        })
    }

    /// Move a page within its document. Returns the final position.
    pub fn move_page(&self, id: PageId, new_position: u32) -> Option<Committed<u32>> {
        let mut session = self.lock();
        let document = session.get_document_mut(id.doc_id)?;
        let value = document.move_page(id.page_num, new_position)?;
        document.mark_modified();
        let version = session.commit();
        Some(Committed { value, version })
    }

    /// Undo every edit to a document. Returns the new change version, or
    /// `None` if the id is unknown.
    pub fn revert_document(&self, id: u32) -> Option<u64> {
        let mut session = self.lock();
        session.get_document_mut(id)?.revert();
        Some(session.commit())
    }

    /// Change the thumbnail resolution and drop every cached thumbnail
    /// Returns the new change version.
    pub fn set_thumbnail_dpi(&self, dpi: f32) -> Result<u64, SessionError> {
        if !dpi.is_finite() || dpi <= 0.0 {
            return Err(SessionError::InvalidDpi(dpi));
        }

        let mut session = self.lock();
        session.thumbnail_dpi = dpi;
        for document in &mut session.documents {
            document.invalidate_thumbnails();
        }
        let version = session.commit();

        tracing::info!(dpi, "Thumbnail DPI changed, caches invalidated");
        Ok(version)
    }
}
