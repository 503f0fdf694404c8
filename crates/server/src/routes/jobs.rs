// crates/server/src/routes/jobs.rs
//! API routes for the background job system.
//!
//! - POST /jobs            — Start a job: {action, params} -> {job_id}
//! - GET  /jobs            — List all jobs (summaries, newest first)
//! - GET  /jobs/actions    — Action allow-list with interruptibility
//! - GET  /jobs/:id/stream — SSE stream of the job's events
//! - GET  /jobs/:id/report — Full snapshot with log history (download/audit)
//! - POST /jobs/:id/cancel — Best-effort cooperative cancellation

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::jobs::channel::Polled;
use crate::jobs::runner::{self, Action};
use crate::jobs::types::{JobEvent, JobSnapshot, JobStatus, JobSummary};
use crate::state::AppState;

/// Idle interval after which a stream emits a heartbeat and re-checks
/// whether the job already finished.
const STREAM_HEARTBEAT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
pub struct StartJobRequest {
    pub action: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct StartJobResponse {
    pub job_id: String,
}

/// POST /api/jobs — validate the action, allocate a record, spawn the
/// worker. Unknown actions and malformed parameters are rejected here,
/// before any record exists.
async fn start_job(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartJobRequest>,
) -> ApiResult<Json<StartJobResponse>> {
    let action = Action::parse(&request.action)
        .ok_or_else(|| ApiError::UnknownAction(request.action.clone()))?;
    runner::validate_params(action, &request.params)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let record = state.jobs.create(action.as_str(), request.params);
    tracing::info!(job_id = %record.id(), action = action.as_str(), "job started");
    runner::spawn(Arc::clone(&record), Arc::clone(&state.recent_envs));

    Ok(Json(StartJobResponse {
        job_id: record.id().clone(),
    }))
}

/// GET /api/jobs — list all jobs, newest first.
async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<Vec<JobSummary>> {
    Json(state.jobs.summaries())
}

#[derive(Debug, Serialize)]
struct ActionInfo {
    name: &'static str,
    interruptible: bool,
}

/// GET /api/jobs/actions — the allow-list, with which actions honor
/// cancellation between steps.
async fn list_actions() -> Json<Vec<ActionInfo>> {
    Json(
        Action::ALL
            .iter()
            .map(|a| ActionInfo {
                name: a.as_str(),
                interruptible: a.interruptible(),
            })
            .collect(),
    )
}

fn sse_event(event: &JobEvent) -> Event {
    Event::default()
        .event(event.name())
        .data(serde_json::to_string(event).unwrap_or_default())
}

/// GET /api/jobs/:id/stream — SSE stream of this job's events.
///
/// A reader attaching after the job finished immediately receives the
/// terminal event; an unknown id yields a single `error` event (an
/// EventSource treats an HTTP error as retryable, a terminal error event
/// it can render). Live events are delivered in push order until the
/// terminal event, with idle heartbeats every [`STREAM_HEARTBEAT`].
async fn stream_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let record = state.jobs.get(&id);

    let stream = async_stream::stream! {
        let Some(record) = record else {
            let event = JobEvent::Error {
                error: format!("job not found: {id}"),
            };
            yield Ok(sse_event(&event));
            return;
        };

        // Subscribe before the status check: any terminal event emitted
        // after the check arrives through the channel, so nothing is lost
        // in between.
        let mut reader = record.subscribe();
        if let Some(terminal) = record.terminal_event() {
            yield Ok(sse_event(&terminal));
            return;
        }

        loop {
            match reader.poll(STREAM_HEARTBEAT).await {
                Polled::Event(event) => {
                    let terminal = event.is_terminal();
                    yield Ok(sse_event(&event));
                    if terminal {
                        break;
                    }
                }
                Polled::TimedOut => {
                    // Don't idle forever around a job that already ended
                    // (e.g. this reader lagged past the terminal event).
                    if let Some(terminal) = record.terminal_event() {
                        yield Ok(sse_event(&terminal));
                        break;
                    }
                    yield Ok(Event::default().event("heartbeat").data("{}"));
                }
                Polled::Lagged(skipped) => {
                    tracing::warn!(
                        job_id = %record.id(),
                        skipped,
                        "stream reader lagged; full history available via report"
                    );
                }
                Polled::Closed => break,
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(STREAM_HEARTBEAT)
            .text("keep-alive"),
    )
}

/// GET /api/jobs/:id/report — full snapshot for download/audit, usable
/// whether the job is running or finished.
async fn job_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<JobSnapshot>> {
    let record = state.jobs.get(&id).ok_or(ApiError::JobNotFound(id))?;
    Ok(Json(record.snapshot()))
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct CancelResponse {
    pub job_id: String,
    /// Whether the token was set (false when the job had already ended).
    pub cancelled: bool,
    pub status: JobStatus,
}

/// POST /api/jobs/:id/cancel — set the cancellation token if the job is
/// still running; a no-op afterwards. Returns immediately either way.
async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<CancelResponse>> {
    let record = state.jobs.get(&id).ok_or(ApiError::JobNotFound(id))?;
    let cancelled = record.request_cancel();
    Ok(Json(CancelResponse {
        job_id: record.id().clone(),
        cancelled,
        status: record.status(),
    }))
}

/// Build the jobs router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/jobs", post(start_job).get(list_jobs))
        .route("/jobs/actions", get(list_actions))
        .route("/jobs/{id}/stream", get(stream_job))
        .route("/jobs/{id}/report", get(job_report))
        .route("/jobs/{id}/cancel", post(cancel_job))
}
