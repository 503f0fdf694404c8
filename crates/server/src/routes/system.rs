// crates/server/src/routes/system.rs
//! System report and update-check endpoints.

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use netboost_core::{system, updater};

use crate::state::AppState;

/// GET /api/system — OS/arch/GPU/CUDA report with a hardware
/// recommendation for the suite installer.
async fn system_report() -> Json<system::SystemReport> {
    Json(system::probe().await)
}

/// GET /api/system/version — update availability. `null` when the check
/// cannot be made (no repo configured, offline); never an error.
async fn version_check() -> Json<Option<updater::UpdateInfo>> {
    Json(updater::check_for_updates(env!("CARGO_PKG_VERSION")).await)
}

/// Build the system routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/system", get(system_report))
        .route("/system/version", get(version_check))
}
