// crates/server/src/routes/templates.rs
//! Template catalog endpoint. Applying a template goes through the job
//! system (`POST /api/jobs` with action `apply_template`).

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use netboost_core::templates;

use crate::state::AppState;

/// GET /api/templates — the preset catalog with per-step labels.
async fn list_templates() -> Json<Vec<templates::Template>> {
    Json(templates::catalog())
}

/// Build the templates routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/templates", get(list_templates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn catalog_is_served() {
        let state = crate::state::AppState::new();
        let app = crate::routes::api_routes(state);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/templates")
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
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["key"], "deep_learning");
        assert!(rows[0]["steps"].as_array().unwrap().len() >= 3);
    }
}
