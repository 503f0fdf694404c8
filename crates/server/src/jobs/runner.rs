// crates/server/src/jobs/runner.rs
//! Action dispatch and job finalization.
//!
//! One spawned task per job. The task drives exactly one collaborator,
//! wires its console output into the job's event stream, and finalizes
//! the record with exactly one terminal event. A collaborator failure is
//! contained here — it never unwinds past the task or touches other jobs.

use std::path::Path;
use std::sync::Arc;

use netboost_core::{backup, envs, net, templates, tools, CancelToken, Console, LogLevel, Outcome, ToolError};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::capture::EventConsole;
use super::record::JobRecord;
use crate::state::{RecentEnv, RecentEnvList};

/// The fixed allow-list of job actions. Unknown names are rejected at the
/// boundary before any record is allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ApplyConfig,
    ApplyTemplate,
    CreateVenv,
    CreateConda,
    InstallSuite,
    QuickInstall,
    UpdateHosts,
}

impl Action {
    pub const ALL: &'static [Action] = &[
        Action::ApplyConfig,
        Action::ApplyTemplate,
        Action::CreateVenv,
        Action::CreateConda,
        Action::InstallSuite,
        Action::QuickInstall,
        Action::UpdateHosts,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "apply_config" => Some(Self::ApplyConfig),
            "apply_template" => Some(Self::ApplyTemplate),
            "create_venv" => Some(Self::CreateVenv),
            "create_conda" => Some(Self::CreateConda),
            "install_suite" => Some(Self::InstallSuite),
            "quick_install" => Some(Self::QuickInstall),
            "update_hosts" => Some(Self::UpdateHosts),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ApplyConfig => "apply_config",
            Self::ApplyTemplate => "apply_template",
            Self::CreateVenv => "create_venv",
            Self::CreateConda => "create_conda",
            Self::InstallSuite => "install_suite",
            Self::QuickInstall => "quick_install",
            Self::UpdateHosts => "update_hosts",
        }
    }

    /// Whether the collaborator checks the cancellation token between its
    /// steps. Non-interruptible actions run to completion even after a
    /// cancel request; the dashboard surfaces this.
    pub fn interruptible(self) -> bool {
        matches!(
            self,
            Self::ApplyTemplate | Self::CreateVenv | Self::CreateConda | Self::InstallSuite
        )
    }
}

// ---------------------------------------------------------------------------
// Parameter shapes
// ---------------------------------------------------------------------------

fn parse_params<T: DeserializeOwned>(params: &Value) -> Result<T, ToolError> {
    serde_json::from_value(params.clone()).map_err(|e| ToolError::InvalidParams(e.to_string()))
}

#[derive(Debug, Deserialize)]
struct ApplyConfigParams {
    module: String,
    mode: String,
    port: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct ApplyTemplateParams {
    template: String,
    port: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct ProjectPathParams {
    path: String,
}

#[derive(Debug, Deserialize)]
struct InstallSuiteParams {
    suite: String,
    target: String,
    env_name: Option<String>,
    packages: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct QuickInstallParams {
    package: String,
}

/// Boundary-side parameter validation: malformed parameters are rejected
/// before any record is allocated, same as unknown action names. The
/// worker re-parses on dispatch; this only answers "would that parse".
pub fn validate_params(action: Action, params: &Value) -> Result<(), ToolError> {
    match action {
        Action::ApplyConfig => parse_params::<ApplyConfigParams>(params).map(drop),
        Action::ApplyTemplate => parse_params::<ApplyTemplateParams>(params).map(drop),
        Action::CreateVenv | Action::CreateConda => {
            parse_params::<ProjectPathParams>(params).map(drop)
        }
        Action::InstallSuite => {
            let p: InstallSuiteParams = parse_params(params)?;
            envs::InstallTarget::parse(&p.target)
                .map(drop)
                .ok_or_else(|| ToolError::InvalidParams(format!("unknown target: {}", p.target)))
        }
        Action::QuickInstall => parse_params::<QuickInstallParams>(params).map(drop),
        Action::UpdateHosts => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Start the worker task for a freshly created record.
pub fn spawn(record: Arc<JobRecord>, recents: RecentEnvList) {
    let dispatched = Arc::clone(&record);
    tokio::spawn(execute(record, move |console, cancel| async move {
        dispatch(dispatched, &console, &cancel, &recents).await
    }));
}

/// Drive one job body to its terminal event: initial progress, the body
/// itself, then exactly one of done/error. Split from [`spawn`] so tests
/// can run arbitrary bodies without shelling out.
pub(crate) async fn execute<F, Fut>(record: Arc<JobRecord>, body: F)
where
    F: FnOnce(EventConsole, CancelToken) -> Fut,
    Fut: std::future::Future<Output = Result<Outcome, ToolError>>,
{
    record.set_progress(5, Some("started"));
    let console = EventConsole::new(Arc::clone(&record));
    let cancel = record.cancel_token();

    match body(console, cancel).await {
        Ok(outcome) => {
            record.set_progress(100, None);
            let result = serde_json::to_value(&outcome).unwrap_or(Value::Null);
            record.finish_done(result);
        }
        Err(ToolError::Cancelled) => {
            record.push_log(LogLevel::Warning, "cancelled by user");
            record.finish_error(ToolError::Cancelled.to_string());
        }
        Err(err) => {
            let message = err.to_string();
            record.push_log(LogLevel::Error, &message);
            record.finish_error(message);
        }
    }
}

async fn resolve_port(requested: Option<u16>, console: &dyn Console) -> u16 {
    match requested {
        Some(port) => port,
        None => net::detect_proxy_port(console).await,
    }
}

/// Record a finished environment install in the process-wide recents list.
/// Its own lock, distinct from the job table's — multiple workers append
/// here concurrently.
fn note_recent_env(recents: &RecentEnvList, outcome: &Outcome) {
    let Some(name) = outcome.data.get("env_name").and_then(Value::as_str) else {
        return;
    };
    let entry = RecentEnv {
        name: name.to_string(),
        path: outcome
            .data
            .get("env_path")
            .and_then(Value::as_str)
            .map(str::to_string),
        kind: outcome
            .data
            .get("kind")
            .and_then(Value::as_str)
            .unwrap_or("env")
            .to_string(),
        created_at: chrono::Utc::now().timestamp_millis(),
    };
    match recents.lock() {
        Ok(mut list) => list.push(entry),
        Err(e) => tracing::error!("recent-envs lock poisoned: {e}"),
    }
}

async fn dispatch(
    record: Arc<JobRecord>,
    console: &EventConsole,
    cancel: &CancelToken,
    recents: &RecentEnvList,
) -> Result<Outcome, ToolError> {
    let action = Action::parse(record.action()).ok_or_else(|| {
        // Boundary validation makes this unreachable; fail the job cleanly
        // anyway rather than panic a worker.
        ToolError::InvalidParams(format!("unknown action: {}", record.action()))
    })?;
    let params = record.params();

    match action {
        Action::ApplyConfig => {
            let p: ApplyConfigParams = parse_params(params)?;
            let port = resolve_port(p.port, console).await;
            backup::backup_all(console).await?;
            tools::apply_config(&p.module, &p.mode, port, console).await
        }
        Action::ApplyTemplate => {
            let p: ApplyTemplateParams = parse_params(params)?;
            let port = resolve_port(p.port, console).await;
            backup::backup_all(console).await?;
            templates::apply(&p.template, port, console, cancel).await
        }
        Action::CreateVenv => {
            let p: ProjectPathParams = parse_params(params)?;
            let outcome = envs::create_venv_and_install(Path::new(&p.path), console, cancel).await?;
            note_recent_env(recents, &outcome);
            Ok(outcome)
        }
        Action::CreateConda => {
            let p: ProjectPathParams = parse_params(params)?;
            let outcome =
                envs::create_conda_and_install(Path::new(&p.path), console, cancel).await?;
            note_recent_env(recents, &outcome);
            Ok(outcome)
        }
        Action::InstallSuite => {
            let p: InstallSuiteParams = parse_params(params)?;
            let target = envs::InstallTarget::parse(&p.target)
                .ok_or_else(|| ToolError::InvalidParams(format!("unknown target: {}", p.target)))?;
            let report = netboost_core::system::probe().await;
            let outcome = envs::install_suite(
                &p.suite,
                target,
                p.env_name,
                p.packages,
                &report,
                console,
                cancel,
            )
            .await?;
            note_recent_env(recents, &outcome);
            Ok(outcome)
        }
        Action::QuickInstall => {
            let p: QuickInstallParams = parse_params(params)?;
            envs::quick_install(&p.package, console).await
        }
        Action::UpdateHosts => tools::hosts::update_github_hosts(console).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::channel::Polled;
    use crate::jobs::table::JobTable;
    use crate::jobs::types::{JobEvent, JobStatus};
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    fn recents() -> RecentEnvList {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[test]
    fn parse_accepts_the_allow_list_only() {
        for action in Action::ALL {
            assert_eq!(Action::parse(action.as_str()), Some(*action));
        }
        assert_eq!(Action::parse("rm_rf"), None);
        assert_eq!(Action::parse(""), None);
    }

    #[test]
    fn validate_params_rejects_malformed_shapes() {
        assert!(validate_params(
            Action::ApplyConfig,
            &json!({"module": "python", "mode": "mirror"})
        )
        .is_ok());
        assert!(validate_params(Action::ApplyConfig, &Value::Null).is_err());
        assert!(validate_params(Action::CreateVenv, &json!({"path": 42})).is_err());
        assert!(validate_params(
            Action::InstallSuite,
            &json!({"suite": "web_dev", "target": "flatpak"})
        )
        .is_err());
        assert!(validate_params(Action::UpdateHosts, &Value::Null).is_ok());
    }

    #[test]
    fn interruptibility_is_declared() {
        assert!(Action::InstallSuite.interruptible());
        assert!(Action::ApplyTemplate.interruptible());
        assert!(!Action::ApplyConfig.interruptible());
        assert!(!Action::UpdateHosts.interruptible());
    }

    #[tokio::test]
    async fn successful_body_emits_progress_then_done() {
        let table = JobTable::new();
        let record = table.create("apply_config", json!({}));
        let mut reader = record.subscribe();

        execute(Arc::clone(&record), |console, _cancel| async move {
            console.info("working");
            console.progress(40, Some("halfway"));
            Ok(Outcome::message("all good"))
        })
        .await;

        let mut events = Vec::new();
        loop {
            match reader.poll(Duration::from_secs(1)).await {
                Polled::Event(event) => {
                    let terminal = event.is_terminal();
                    events.push(event);
                    if terminal {
                        break;
                    }
                }
                other => panic!("stream ended early: {other:?}"),
            }
        }

        // progress(5) .. log .. progress(40) .. progress(100) .. done
        assert!(matches!(events.first(), Some(JobEvent::Progress { value: 5, .. })));
        assert!(matches!(events.last(), Some(JobEvent::Done { .. })));
        let progress_values: Vec<u8> = events
            .iter()
            .filter_map(|e| match e {
                JobEvent::Progress { value, .. } => Some(*value),
                _ => None,
            })
            .collect();
        assert!(progress_values.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(progress_values.last(), Some(&100));

        let snap = record.snapshot();
        assert_eq!(snap.status, JobStatus::Done);
        assert_eq!(snap.result.as_ref().unwrap()["message"], "all good");
        assert!(snap.error.is_none());
    }

    #[tokio::test]
    async fn failing_body_logs_and_finishes_error() {
        let table = JobTable::new();
        let record = table.create("update_hosts", json!({}));

        execute(Arc::clone(&record), |_console, _cancel| async move {
            Err(ToolError::Network("connection refused".into()))
        })
        .await;

        let snap = record.snapshot();
        assert_eq!(snap.status, JobStatus::Error);
        assert!(snap.error.as_deref().unwrap().contains("connection refused"));
        assert!(snap.result.is_none());
        // The failure is also in the log history at level error.
        assert!(snap
            .logs
            .iter()
            .any(|l| l.message.contains("connection refused")));
    }

    #[tokio::test]
    async fn cancelled_body_finishes_with_cancel_marker() {
        let table = JobTable::new();
        let record = table.create("install_suite", json!({}));
        record.request_cancel();

        execute(Arc::clone(&record), |_console, cancel| async move {
            cancel.checkpoint()?;
            unreachable!("checkpoint must abort first");
        })
        .await;

        let snap = record.snapshot();
        assert_eq!(snap.status, JobStatus::Error);
        assert_eq!(snap.error.as_deref(), Some("cancelled by user"));
    }

    #[tokio::test]
    async fn worker_panic_does_not_poison_other_jobs() {
        let table = Arc::new(JobTable::new());
        let record = table.create("apply_config", json!({}));

        // A panicking body only kills its own task.
        let handle = tokio::spawn(execute(Arc::clone(&record), |_console, _cancel| async move {
            panic!("collaborator exploded");
        }));
        assert!(handle.await.is_err());

        // The table still works and other jobs run to completion.
        let other = table.create("apply_config", json!({}));
        execute(Arc::clone(&other), |_c, _t| async move {
            Ok(Outcome::message("fine"))
        })
        .await;
        assert_eq!(other.snapshot().status, JobStatus::Done);
    }

    #[tokio::test]
    async fn fifty_concurrent_jobs_stay_isolated() {
        let table = Arc::new(JobTable::new());
        let mut handles = Vec::new();

        for i in 0..50 {
            let record = table.create("quick_install", json!({ "i": i }));
            let mut reader = record.subscribe();
            let rec = Arc::clone(&record);

            handles.push(tokio::spawn(async move {
                let job_tag = format!("job-{i}");
                let tag = job_tag.clone();
                let worker = tokio::spawn(execute(Arc::clone(&rec), move |console, _cancel| {
                    let tag = tag.clone();
                    async move {
                        for step in 0..5 {
                            console.info(&format!("{tag} step {step}"));
                            tokio::task::yield_now().await;
                        }
                        Ok(Outcome::message(tag))
                    }
                }));

                // Drain this job's stream to its terminal event.
                let mut messages = Vec::new();
                loop {
                    match reader.poll(Duration::from_secs(5)).await {
                        Polled::Event(JobEvent::Log { message, .. }) => messages.push(message),
                        Polled::Event(event) if event.is_terminal() => break,
                        Polled::Event(_) => {}
                        other => panic!("stream stalled: {other:?}"),
                    }
                }
                worker.await.expect("worker task");

                // Every log line in this stream belongs to this job.
                assert_eq!(messages.len(), 5);
                assert!(messages.iter().all(|m| m.starts_with(&job_tag)));
                rec.id().clone()
            }));
        }

        let mut ids = std::collections::HashSet::new();
        for handle in handles {
            assert!(ids.insert(handle.await.expect("join")));
        }
        assert_eq!(ids.len(), 50);
    }

    #[tokio::test]
    async fn env_outcomes_land_in_recent_list() {
        let recents = recents();
        let outcome = Outcome::with_data(
            "env ready",
            json!({"env_name": "proj_env", "env_path": "/tmp/proj", "kind": "conda"}),
        );
        note_recent_env(&recents, &outcome);
        note_recent_env(&recents, &Outcome::message("no env data"));

        let list = recents.lock().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "proj_env");
        assert_eq!(list[0].kind, "conda");
    }

    #[tokio::test]
    async fn bad_params_fail_the_job_not_the_process() {
        let table = JobTable::new();
        // Valid action, wrong parameter shape.
        let record = table.create("create_venv", json!({"nope": true}));
        let recents = recents();
        let console = EventConsole::new(Arc::clone(&record));
        let cancel = record.cancel_token();

        let err = dispatch(Arc::clone(&record), &console, &cancel, &recents)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(_)));
    }
}
