//! Page routes
//!
//! Pages are addressed by their stable `<doc>-<page>` id.
//!
//! Endpoints:
//! - GET  /api/v1/page/:page_id           - Page state
//! - GET  /api/v1/page/:page_id/thumbnail - Cached thumbnail image
//! - GET  /api/v1/page/:page_id/full      - Uncached full-size render (`?dpi=`)
//! - POST /api/v1/page/:page_id/rotate    - Rotate by `{ "degrees": 90 }`
//! - POST /api/v1/page/:page_id/mirror    - Toggle `{ "axis": "horizontal" }`
//! - POST /api/v1/page/:page_id/delete    - Soft-delete
//! - POST /api/v1/page/:page_id/restore   - Undo a soft-delete
//! - POST /api/v1/page/:page_id/move      - Move to `{ "position": 0 }`
//!
//! Image responses are always 200. When rendering failed the body is an
//! error placeholder and `X-Render-Error` carries the reason.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::blocking;
use super::views::PageView;
use crate::error::{AppError, Result};
use crate::session::{Committed, MirrorAxis, PageId, PageModification, Rotation, Thumbnail};
use crate::state::AppState;

/// Header naming the failure behind a placeholder image
pub const RENDER_ERROR_HEADER: &str = "x-render-error";

/// Full-size renders above this are refused
const MAX_FULL_SIZE_DPI: f32 = 600.0;

#[derive(Debug, Deserialize)]
pub struct RotateRequest {
    pub degrees: i32,
}

#[derive(Debug, Deserialize)]
pub struct MirrorRequest {
    pub axis: MirrorAxis,
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub position: u32,
}

#[derive(Debug, Deserialize)]
pub struct FullSizeQuery {
    pub dpi: Option<f32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEditResponse {
    pub id: PageId,
    pub modifications: PageModification,
    pub description: String,
    pub version: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveResponse {
    pub id: PageId,
    pub position: u32,
    pub version: u64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:page_id", get(get_page))
        .route("/:page_id/thumbnail", get(get_thumbnail))
        .route("/:page_id/full", get(get_full_size))
        .route("/:page_id/rotate", post(rotate_page))
        .route("/:page_id/mirror", post(mirror_page))
        .route("/:page_id/delete", post(delete_page))
        .route("/:page_id/restore", post(restore_page))
        .route("/:page_id/move", post(move_page))
}

fn image_response(content_type: &'static str, thumbnail: Thumbnail, cache: &'static str) -> Response {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, cache);
    if let Some(message) = thumbnail.error_message() {
        builder = builder.header(RENDER_ERROR_HEADER, message);
    }

    builder
        .body(Body::from(thumbnail.bytes().to_vec()))
        .expect("hardcoded headers cannot fail")
}

fn edit_response(
    id: PageId,
    committed: Option<Committed<PageModification>>,
) -> Result<Json<PageEditResponse>> {
    let Committed {
        value: modifications,
        version,
    } = committed.ok_or_else(|| AppError::page_not_found(id))?;
    Ok(Json(PageEditResponse {
        id,
        modifications,
        description: modifications.describe(),
        version,
    }))
}

async fn get_page(
    State(state): State<AppState>,
    Path(page_id): Path<String>,
) -> Result<Json<PageView>> {
    let id = PageId::parse(&page_id)?;
    let view = blocking(&state, move |state| {
        let session = state.session().lock();
        session.get_page(id).map(PageView::from)
    })
    .await?
    .ok_or_else(|| AppError::page_not_found(id))?;
    Ok(Json(view))
}

async fn get_thumbnail(
    State(state): State<AppState>,
    Path(page_id): Path<String>,
) -> Result<Response> {
    let id = PageId::parse(&page_id)?;

    // A miss renders while holding the session lock
    let thumbnail = blocking(&state, move |state| {
        let mut session = state.session().lock();
        let dpi = session.thumbnail_dpi();
        let (page, document) = session
            .get_document_mut(id.doc_id)?
            .page_with_handle_mut(id.page_num)?;
        Some(state.renderer().render_thumbnail(page, document, dpi))
    })
    .await?
    .ok_or_else(|| AppError::page_not_found(id))?;

    Ok(image_response(
        state.renderer().content_type(),
        thumbnail,
        "no-cache",
    ))
}

async fn get_full_size(
    State(state): State<AppState>,
    Path(page_id): Path<String>,
    Query(query): Query<FullSizeQuery>,
) -> Result<Response> {
    let id = PageId::parse(&page_id)?;
    let dpi = query.dpi.unwrap_or(state.config().render.full_size_dpi);
    if !dpi.is_finite() || dpi <= 0.0 || dpi > MAX_FULL_SIZE_DPI {
        return Err(AppError::BadRequest(format!(
            "dpi must be in (0, {}], got {}",
            MAX_FULL_SIZE_DPI, dpi
        )));
    }

    let thumbnail = blocking(&state, move |state| {
        let session = state.session().lock();
        let document = session.get_document(id.doc_id)?;
        let page = document.page(id.page_num)?;
        Some(
            state
                .renderer()
                .render_full_size(document, page.original_index(), dpi),
        )
    })
    .await?
    .ok_or_else(|| AppError::page_not_found(id))?;

    Ok(image_response(
        state.renderer().content_type(),
        thumbnail,
        "no-store",
    ))
}

async fn rotate_page(
    State(state): State<AppState>,
    Path(page_id): Path<String>,
    Json(request): Json<RotateRequest>,
) -> Result<Json<PageEditResponse>> {
    let id = PageId::parse(&page_id)?;
    let delta = Rotation::from_delta(request.degrees).ok_or_else(|| {
        AppError::BadRequest(format!(
            "Rotation must be one of ±90, ±180, ±270 degrees, got {}",
            request.degrees
        ))
    })?;
    let committed = blocking(&state, move |state| state.session().rotate_page(id, delta)).await?;
    edit_response(id, committed)
}

async fn mirror_page(
    State(state): State<AppState>,
    Path(page_id): Path<String>,
    Json(request): Json<MirrorRequest>,
) -> Result<Json<PageEditResponse>> {
    let id = PageId::parse(&page_id)?;
    let axis = request.axis;
    let committed = blocking(&state, move |state| state.session().mirror_page(id, axis)).await?;
    edit_response(id, committed)
}

async fn delete_page(
    State(state): State<AppState>,
    Path(page_id): Path<String>,
) -> Result<Json<PageEditResponse>> {
    set_deleted(state, &page_id, true).await
}

async fn restore_page(
    State(state): State<AppState>,
    Path(page_id): Path<String>,
) -> Result<Json<PageEditResponse>> {
    set_deleted(state, &page_id, false).await
}

async fn set_deleted(
    state: AppState,
    page_id: &str,
    deleted: bool,
) -> Result<Json<PageEditResponse>> {
    let id = PageId::parse(page_id)?;
    let committed =
        blocking(&state, move |state| state.session().set_page_deleted(id, deleted)).await?;
    edit_response(id, committed)
}

async fn move_page(
    State(state): State<AppState>,
    Path(page_id): Path<String>,
    Json(request): Json<MoveRequest>,
) -> Result<Json<MoveResponse>> {
    let id = PageId::parse(&page_id)?;
    let position = request.position;
    let Committed {
        value: position,
        version,
    } = blocking(&state, move |state| state.session().move_page(id, position))
        .await?
        .ok_or_else(|| AppError::page_not_found(id))?;
    Ok(Json(MoveResponse {
        id,
        position,
        version,
    }))
}
