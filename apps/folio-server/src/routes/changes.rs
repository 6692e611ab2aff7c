//! Change notification long-poll
//!
//! `GET /api/v1/changes?since=N&timeout_ms=M` answers as soon as the session
//! version exceeds `N`, or after `M` milliseconds with `changed: false`.
//! Without `since` it returns the current version immediately.

use std::time::Duration;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

const DEFAULT_TIMEOUT_MS: u64 = 25_000;
const MAX_TIMEOUT_MS: u64 = 60_000;

#[derive(Debug, Deserialize)]
pub struct ChangesQuery {
    pub since: Option<u64>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ChangesResponse {
    pub version: u64,
    pub changed: bool,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(wait_for_changes))
}

async fn wait_for_changes(
    State(state): State<AppState>,
    Query(query): Query<ChangesQuery>,
) -> Json<ChangesResponse> {
    let Some(since) = query.since else {
        return Json(ChangesResponse {
            version: state.session().change_version(),
            changed: false,
        });
    };

    let timeout = Duration::from_millis(
        query
            .timeout_ms
            .unwrap_or(DEFAULT_TIMEOUT_MS)
            .min(MAX_TIMEOUT_MS),
    );
    let version = state.session().wait_for_change(since, timeout).await;

    Json(ChangesResponse {
        version,
        changed: version > since,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::StatusCode;

    use crate::routes::test_support::TestApp;

    #[tokio::test]
    async fn without_since_reports_current_version() {
        let app = TestApp::new(1);
        app.open("a.pdf");

        let (status, json) = app.get_json("/api/v1/changes").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["version"], 1);
        assert_eq!(json["changed"], false);
    }

    #[tokio::test]
    async fn stale_since_returns_immediately() {
        let app = TestApp::new(1);
        app.open("a.pdf");

        let (_, json) = app.get_json("/api/v1/changes?since=0&timeout_ms=10").await;
        assert_eq!(json["version"], 1);
        assert_eq!(json["changed"], true);
    }

    #[tokio::test]
    async fn times_out_without_changes() {
        let app = TestApp::new(1);

        let (_, json) = app.get_json("/api/v1/changes?since=0&timeout_ms=20").await;
        assert_eq!(json["version"], 0);
        assert_eq!(json["changed"], false);
    }

    #[tokio::test]
    async fn wakes_on_edit() {
        let app = TestApp::new(1);
        let id = app.open("a.pdf");

        let session_state = app.state.clone();
        let editor = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            session_state
                .session()
                .set_page_deleted(crate::session::PageId::new(id, 0), true);
        });

        let (_, json) = app
            .get_json("/api/v1/changes?since=1&timeout_ms=5000")
            .await;
        editor.await.unwrap();
        assert_eq!(json["version"], 2);
        assert_eq!(json["changed"], true);
    }
}
