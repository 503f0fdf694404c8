// crates/server/src/routes/mod.rs
//! API route handlers for the netboost server.

pub mod envs;
pub mod health;
pub mod jobs;
pub mod network;
pub mod system;
pub mod templates;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET  /api/health - Health check
/// - GET  /api/jobs - List all jobs (summaries, newest first)
/// - POST /api/jobs - Start a job: {action, params} -> {job_id}
/// - GET  /api/jobs/actions - Action allow-list with interruptibility
/// - GET  /api/jobs/:id/stream - SSE stream of job events
/// - GET  /api/jobs/:id/report - Full job snapshot with log history
/// - POST /api/jobs/:id/cancel - Request cooperative cancellation
/// - GET  /api/network/port - Detected local proxy port
/// - GET  /api/network/recommend - Mirror-vs-proxy latency race
/// - GET  /api/system - Hardware/OS report
/// - GET  /api/system/version - Update availability check
/// - GET  /api/templates - Template catalog
/// - POST /api/envs/analyze - Analyze a project directory
/// - GET  /api/envs/recent - Recent environment installs
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", jobs::router())
        .nest("/api", network::router())
        .nest("/api", system::router())
        .nest("/api", templates::router())
        .nest("/api", envs::router())
        .with_state(state)
}
