//! Document routes
//!
//! Endpoints:
//! - GET    /api/v1/documents              - List open documents
//! - POST   /api/v1/documents              - Upload a PDF (multipart field `file`)
//! - GET    /api/v1/documents/:id          - Document detail with pages in display order
//! - DELETE /api/v1/documents/:id          - Close a document
//! - GET    /api/v1/documents/:id/original - Original PDF bytes
//! - POST   /api/v1/documents/:id/revert   - Drop all page edits

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use super::blocking;
use super::views::{DocumentDetail, DocumentSummary};
use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentSummary>,
    pub total: usize,
    pub version: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub id: u32,
    pub filename: String,
    pub page_count: usize,
    pub content_hash: String,
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: u64,
}

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(list_documents)
                .post(upload_document)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/:id", get(get_document).delete(delete_document))
        .route("/:id/original", get(get_original))
        .route("/:id/revert", post(revert_document))
}

async fn list_documents(State(state): State<AppState>) -> Result<Json<DocumentListResponse>> {
    let documents = blocking(&state, |state| {
        let session = state.session().lock();
        session
            .documents()
            .iter()
            .map(DocumentSummary::from)
            .collect::<Vec<_>>()
    })
    .await?;

    Ok(Json(DocumentListResponse {
        total: documents.len(),
        documents,
        version: state.session().change_version(),
    }))
}

async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read upload: {}", e))
    })? {
        let name = field.name().unwrap_or("").to_string();
        if name != "file" {
            tracing::debug!("Skipping multipart field '{}'", name);
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "upload.pdf".to_string());
        let data = field.bytes().await.map_err(|e| {
            tracing::error!("Failed to read file data: {}", e);
            AppError::BadRequest(format!("Failed to read file data: {}", e))
        })?;

        tracing::debug!("Received upload '{}' ({} bytes)", filename, data.len());

        // Opening parses the whole file, then registers under the lock
        let response = blocking(&state, move |state| -> Result<UploadResponse> {
            let id = state
                .session()
                .add_document_from_bytes(filename, data.to_vec())?;
            let session = state.session().lock();
            let doc = session
                .get_document(id)
                .ok_or_else(|| AppError::document_not_found(id))?;
            Ok(UploadResponse {
                id,
                filename: doc.filename().to_string(),
                page_count: doc.page_count(),
                content_hash: doc.content_hash().to_string(),
            })
        })
        .await??;

        return Ok(Json(response));
    }

    Err(AppError::BadRequest("No 'file' field in upload".to_string()))
}

async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<DocumentDetail>> {
    let detail = blocking(&state, move |state| {
        let session = state.session().lock();
        session.get_document(id).map(DocumentDetail::from)
    })
    .await?
    .ok_or_else(|| AppError::document_not_found(id))?;
    Ok(Json(detail))
}

async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<StatusCode> {
    if blocking(&state, move |state| state.session().remove_document(id)).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::document_not_found(id))
    }
}

async fn get_original(
    State(state): State<AppState>,
    Path(id): Path<u32>,
    headers: HeaderMap,
) -> Result<Response> {
    let (bytes, hash, filename) = blocking(&state, move |state| {
        let session = state.session().lock();
        session.get_document(id).map(|doc| {
            (
                doc.original_bytes().clone(),
                doc.content_hash().to_string(),
                doc.filename().to_string(),
            )
        })
    })
    .await?
    .ok_or_else(|| AppError::document_not_found(id))?;

    let etag = format!("\"{}\"", hash);
    let not_modified = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == etag);

    if not_modified {
        let response = Response::builder()
            .status(StatusCode::NOT_MODIFIED)
            .header(header::ETAG, &etag)
            .body(Body::empty())
            .expect("hardcoded headers cannot fail");
        return Ok(response);
    }

    let disposition = format!(
        "inline; filename=\"{}\"",
        filename.replace(['"', '\\'], "_")
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(header::ETAG, &etag)
        .header(header::CACHE_CONTROL, "private, max-age=3600")
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from(bytes.to_vec()))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))
}

async fn revert_document(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<VersionResponse>> {
    let version = blocking(&state, move |state| state.session().revert_document(id))
        .await?
        .ok_or_else(|| AppError::document_not_found(id))?;
    Ok(Json(VersionResponse { version }))
}
