// crates/server/src/lib.rs
//! Netboost server library.
//!
//! Axum-based HTTP server for the netboost dashboard: a REST/SSE API over
//! the background job system plus the synchronous probing endpoints, and
//! optional static serving of the dashboard bundle.

pub mod error;
pub mod jobs;
pub mod routes;
pub mod state;

pub use error::*;
pub use routes::api_routes;
pub use state::AppState;

use std::path::PathBuf;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - API routes (health, jobs, network, system, templates, envs)
/// - Optional static file serving for the dashboard bundle
/// - CORS for development (allows any origin)
/// - Request tracing
pub fn create_app(state: std::sync::Arc<AppState>, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new().merge(api_routes(state));
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(cors).layer(TraceLayer::new_for_http())
}

// ============================================================================
// Integration Tests
// ============================================================================
