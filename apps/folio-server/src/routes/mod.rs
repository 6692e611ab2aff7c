//! Route modules for Folio Server
//!
//! Handlers are thin: parse ids, take the session lock (on a blocking thread
//! whenever the engine may run), and turn session values into JSON or image
//! responses.

pub mod changes;
pub mod documents;
pub mod health;
pub mod pages;
pub mod settings;
mod views;

use axum::Router;

use crate::error::{AppError, Result};
use crate::state::AppState;

pub use views::{DocumentDetail, DocumentSummary, PageView};

/// Build the application router
pub fn router(state: AppState) -> Router {
    let max_upload = state.config().max_upload_bytes();

    Router::new()
        .nest("/health", health::router())
        .nest("/api/v1/documents", documents::router(max_upload))
        .nest("/api/v1/page", pages::router())
        .nest("/api/v1/changes", changes::router())
        .nest("/api/v1/settings", settings::router())
        .with_state(state)
}

/// Run `f` on the blocking pool.
///
/// Every handler that takes the session lock goes through here: the lock may
/// be held across a MuPDF render, and waiting for it must not park an async
/// worker.
pub(crate) async fn blocking<T, F>(state: &AppState, f: F) -> Result<T>
where
    F: FnOnce(&AppState) -> T + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))
}
