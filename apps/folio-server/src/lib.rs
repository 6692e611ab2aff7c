//! Folio Server Library
//!
//! Session layer of a PDF page-editing server. Open documents, their pages and
//! the per-page edits a client has made live in one in-memory registry; pages
//! are rendered to thumbnails on demand and cached until edited.
//!
//! # Modules
//!
//! - `session`: Page ids, page edits, document and global session state
//! - `render`: Thumbnail rendering with cache and error placeholders
//! - `engine`: PDF engine and image encoder seams, MuPDF backend
//! - `routes`: HTTP API over the session
//! - `config`, `error`, `state`: server plumbing

pub mod config;
pub mod engine;
pub mod error;
pub mod render;
pub mod routes;
pub mod session;
pub mod state;
