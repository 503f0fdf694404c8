// crates/server/src/routes/envs.rs
//! Project analysis and the recent-environments list.

use std::path::Path;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use netboost_core::envs;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, RecentEnv};

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub path: String,
}

/// POST /api/envs/analyze — inspect a project directory for dependency
/// manifests and recommend an environment strategy.
async fn analyze(
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<Json<envs::ProjectAnalysis>> {
    let analysis = envs::analyze_project(Path::new(&request.path))
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(analysis))
}

/// GET /api/envs/recent — environments installed this process, newest
/// first.
async fn recent(State(state): State<Arc<AppState>>) -> Json<Vec<RecentEnv>> {
    Json(state.recent_envs())
}

/// Build the envs routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/envs/analyze", post(analyze))
        .route("/envs/recent", get(recent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn analyze_missing_path_is_bad_request() {
        let state = crate::state::AppState::new();
        let app = crate::routes::api_routes(state);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/envs/analyze")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({"path": "/definitely/not/here"}).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn recent_list_starts_empty() {
        let state = crate::state::AppState::new();
        let app = crate::routes::api_routes(state);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/envs/recent")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let rows: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
        assert!(rows.is_empty());
    }
}
