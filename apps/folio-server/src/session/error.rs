//! Session error types
//!
//! Only registration failures and malformed page ids leave the session layer
//! as errors. Unknown ids are `None`, and render failures become placeholder
//! images inside the renderer.

use std::path::PathBuf;

use thiserror::Error;

use crate::engine::EngineError;

/// Failures while registering or configuring documents
#[derive(Debug, Error)]
pub enum SessionError {
    /// The engine could not decode the document
    #[error("Failed to open '{filename}': {source}")]
    OpenFailed {
        filename: String,
        #[source]
        source: EngineError,
    },

    /// The document bytes could not be read from disk
    #[error("Failed to read {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every document id has been handed out
    #[error("Document id space exhausted")]
    IdsExhausted,

    /// Thumbnail DPI must be a positive, finite number
    #[error("Invalid thumbnail DPI: {0}")]
    InvalidDpi(f32),
}

/// Malformed page identifier strings
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageIdParseError {
    #[error("Invalid page id '{0}': expected '<doc>-<page>'")]
    InvalidFormat(String),
}
