//! Session settings
//!
//! - GET /api/v1/settings             - Current render settings
//! - PUT /api/v1/settings/thumbnail-dpi - Change thumbnail resolution

use axum::{extract::State, routing::{get, put}, Json, Router};
use serde::{Deserialize, Serialize};

use super::blocking;
use crate::engine::ThumbnailFormat;
use crate::error::Result;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    pub thumbnail_dpi: f32,
    pub full_size_dpi: f32,
    pub thumbnail_format: ThumbnailFormat,
    pub version: u64,
}

#[derive(Debug, Deserialize)]
pub struct ThumbnailDpiRequest {
    pub dpi: f32,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_settings))
        .route("/thumbnail-dpi", put(set_thumbnail_dpi))
}

fn settings(state: &AppState, thumbnail_dpi: f32, version: u64) -> SettingsResponse {
    let render = &state.config().render;
    SettingsResponse {
        thumbnail_dpi,
        full_size_dpi: render.full_size_dpi,
        thumbnail_format: render.thumbnail_format,
        version,
    }
}

async fn get_settings(State(state): State<AppState>) -> Result<Json<SettingsResponse>> {
    let response = blocking(&state, |state| {
        let thumbnail_dpi = state.session().lock().thumbnail_dpi();
        settings(state, thumbnail_dpi, state.session().change_version())
    })
    .await?;
    Ok(Json(response))
}

async fn set_thumbnail_dpi(
    State(state): State<AppState>,
    Json(request): Json<ThumbnailDpiRequest>,
) -> Result<Json<SettingsResponse>> {
    let dpi = request.dpi;
    let version = blocking(&state, move |state| state.session().set_thumbnail_dpi(dpi)).await??;
    Ok(Json(settings(&state, dpi, version)))
}
