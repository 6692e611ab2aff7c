//! Interactive editing session
//!
//! In-memory state for the documents a user has open: stable page ids,
//! non-destructive page edits, per-page thumbnail caches and a change
//! version for cross-tab notification.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      GlobalState                         │
//! │  Mutex<Registry>            AtomicU64 change_version     │
//! └──────────────────────────────────────────────────────────┘
//!                │ documents (arena, looked up by id)
//!                ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │  DocumentState  (engine handle, original bytes, color)   │
//! └──────────────────────────────────────────────────────────┘
//!                │ pages (display order)
//!                ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │  PageState  (PageId, indices, PageModification, cache)   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing holds a pointer into another entity. Pages know their document
//! only by `doc_id`, and every cross-entity hop is a registry lookup, so a
//! removed document leaves no dangling references behind.
//!
//! # Usage
//!
//! ```rust,ignore
//! let state = GlobalState::new(Arc::new(MupdfEngine::new()), SessionConfig::default());
//! let doc_id = state.add_document_from_path("report.pdf")?;
//!
//! let page = PageId::parse("1-0")?;
//! state.rotate_page(page, Rotation::Quarter);
//!
//! let session = state.lock();
//! let doc = session.get_document(doc_id).expect("just added");
//! println!("{}", doc.page(0).unwrap().modifications().describe());
//! ```

mod document;
mod error;
mod global;
mod modification;
mod page;
mod page_id;

pub use document::{DocumentColor, DocumentOrigin, DocumentState};
pub use error::{PageIdParseError, SessionError};
pub use global::{Committed, GlobalState, Registry, SessionConfig, SessionGuard, DEFAULT_THUMBNAIL_DPI};
pub use modification::{MirrorAxis, PageModification, Rotation};
pub use page::{PageState, Thumbnail};
pub use page_id::PageId;
