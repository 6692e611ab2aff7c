//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::blocking;
use crate::error::Result;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    service: &'static str,
    documents: usize,
    change_version: u64,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}

async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    let documents = blocking(&state, |state| state.session().lock().len()).await?;

    Ok(Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        service: "folio-server",
        documents,
        change_version: state.session().change_version(),
    }))
}
