// crates/server/src/routes/network.rs
//! Network probing endpoints: proxy-port detection and the latency race.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use netboost_core::console::NullConsole;
use netboost_core::net;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PortResponse {
    pub port: u16,
}

/// GET /api/network/port — detect the active local proxy port.
async fn detect_port(State(_state): State<Arc<AppState>>) -> Json<PortResponse> {
    let port = net::detect_proxy_port(&NullConsole).await;
    Json(PortResponse { port })
}

#[derive(Debug, Deserialize)]
struct RecommendQuery {
    /// Proxy port to race against; detected when omitted.
    port: Option<u16>,
}

/// GET /api/network/recommend?port= — run the mirror-vs-proxy latency
/// race and return the winner with the measured timings.
async fn recommend(
    State(_state): State<Arc<AppState>>,
    Query(query): Query<RecommendQuery>,
) -> Json<net::Recommendation> {
    let port = match query.port {
        Some(port) => port,
        None => net::detect_proxy_port(&NullConsole).await,
    };
    Json(net::recommend_config(port, &NullConsole).await)
}

/// Build the network routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/network/port", get(detect_port))
        .route("/network/recommend", get(recommend))
}
