// crates/server/src/jobs/record.rs
//! Mutable state of one job.
//!
//! Single-writer discipline: after creation, only the owning worker task
//! calls the mutating methods. Readers (stream handlers, the report
//! endpoint) go through atomics and the short-lived per-record locks, so
//! nothing here ever contends with the job-table lock.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU8, Ordering};
use std::sync::{Mutex, RwLock};

use netboost_core::{CancelToken, LogLevel};
use serde_json::Value;

use super::channel::{EventChannel, EventReader};
use super::types::{JobEvent, JobId, JobSnapshot, JobStatus, JobSummary, LogEntry};

pub struct JobRecord {
    id: JobId,
    action: String,
    params: Value,
    created_at: i64,

    status: AtomicU8,
    progress: AtomicU8,
    updated_at: AtomicI64,
    /// Latched by the first terminal event; suppresses everything after.
    terminal: AtomicBool,

    logs: Mutex<Vec<LogEntry>>,
    result: RwLock<Option<Value>>,
    error: RwLock<Option<String>>,

    cancel: CancelToken,
    channel: EventChannel,
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl JobRecord {
    pub(crate) fn new(id: JobId, action: String, params: Value) -> Self {
        let now = now_ms();
        Self {
            id,
            action,
            params,
            created_at: now,
            status: AtomicU8::new(JobStatus::Running as u8),
            progress: AtomicU8::new(0),
            updated_at: AtomicI64::new(now),
            terminal: AtomicBool::new(false),
            logs: Mutex::new(Vec::new()),
            result: RwLock::new(None),
            error: RwLock::new(None),
            cancel: CancelToken::new(),
            channel: EventChannel::new(),
        }
    }

    // -- Identity -------------------------------------------------------------

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn params(&self) -> &Value {
        &self.params
    }

    pub fn status(&self) -> JobStatus {
        JobStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn progress(&self) -> u8 {
        self.progress.load(Ordering::Relaxed)
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    fn touch(&self) {
        self.updated_at.store(now_ms(), Ordering::Relaxed);
    }

    // -- Mutation (worker task only) ------------------------------------------

    /// Append a log line and push the matching event. No-op once terminal.
    pub fn push_log(&self, level: LogLevel, message: &str) {
        if self.terminal.load(Ordering::Acquire) {
            return;
        }
        let entry = LogEntry {
            ts: now_ms(),
            level,
            message: message.to_string(),
        };
        match self.logs.lock() {
            Ok(mut logs) => logs.push(entry.clone()),
            Err(e) => tracing::error!("log mutex poisoned for job {}: {e}", self.id),
        }
        self.touch();
        self.channel.push(JobEvent::Log {
            ts: entry.ts,
            level: entry.level,
            message: entry.message,
        });
    }

    /// Raise progress to `value` (clamped to 100). Progress never goes
    /// backwards: a stale lower value re-emits the current maximum.
    /// No-op once terminal.
    pub fn set_progress(&self, value: u8, title: Option<&str>) {
        if self.terminal.load(Ordering::Acquire) {
            return;
        }
        let value = value.min(100);
        let previous = self.progress.fetch_max(value, Ordering::AcqRel);
        let shown = previous.max(value);
        self.touch();
        self.channel.push(JobEvent::Progress {
            value: shown,
            title: title.map(str::to_string),
        });
    }

    /// Finalize as done. First terminal call wins; later calls are no-ops.
    pub fn finish_done(&self, result: Value) {
        if self.terminal.swap(true, Ordering::AcqRel) {
            return;
        }
        self.progress.fetch_max(100, Ordering::AcqRel);
        if let Ok(mut slot) = self.result.write() {
            *slot = Some(result.clone());
        }
        self.status.store(JobStatus::Done as u8, Ordering::Release);
        self.touch();
        self.channel.push(JobEvent::Done { result });
    }

    /// Finalize as failed (collaborator error or cancellation).
    pub fn finish_error(&self, message: impl Into<String>) {
        if self.terminal.swap(true, Ordering::AcqRel) {
            return;
        }
        let message = message.into();
        if let Ok(mut slot) = self.error.write() {
            *slot = Some(message.clone());
        }
        self.status.store(JobStatus::Error as u8, Ordering::Release);
        self.touch();
        self.channel.push(JobEvent::Error { error: message });
    }

    /// Set the cancellation token if the job is still running; a request
    /// after the terminal event is a no-op and changes nothing.
    pub fn request_cancel(&self) -> bool {
        if self.status().is_terminal() {
            return false;
        }
        self.cancel.cancel();
        true
    }

    // -- Readers --------------------------------------------------------------

    /// Attach a live event reader at the current stream position.
    pub fn subscribe(&self) -> EventReader {
        self.channel.subscribe()
    }

    /// Reconstruct the terminal event for a reader that attached after the
    /// job finished. `None` while still running.
    pub fn terminal_event(&self) -> Option<JobEvent> {
        match self.status() {
            JobStatus::Running => None,
            JobStatus::Done => Some(JobEvent::Done {
                result: self
                    .result
                    .read()
                    .ok()
                    .and_then(|g| g.clone())
                    .unwrap_or(Value::Null),
            }),
            JobStatus::Error => Some(JobEvent::Error {
                error: self
                    .error
                    .read()
                    .ok()
                    .and_then(|g| g.clone())
                    .unwrap_or_default(),
            }),
        }
    }

    /// Full point-in-time readout, log history included.
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id.clone(),
            action: self.action.clone(),
            params: self.params.clone(),
            status: self.status(),
            progress: self.progress(),
            created_at: self.created_at,
            updated_at: self.updated_at.load(Ordering::Relaxed),
            result: self.result.read().ok().and_then(|g| g.clone()),
            error: self.error.read().ok().and_then(|g| g.clone()),
            logs: self.logs.lock().map(|g| g.clone()).unwrap_or_default(),
        }
    }

    /// Log-free listing row.
    pub fn summary(&self) -> JobSummary {
        JobSummary {
            id: self.id.clone(),
            action: self.action.clone(),
            status: self.status(),
            progress: self.progress(),
            created_at: self.created_at,
            updated_at: self.updated_at.load(Ordering::Relaxed),
        }
    }
}
