// crates/server/src/jobs/types.rs
//! Types for the background job system.

use netboost_core::LogLevel;
use serde::Serialize;
use serde_json::Value;

/// Unique identifier for a job (UUID v4, never reused).
pub type JobId = String;

/// Status of a background job. A job leaves `Running` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum JobStatus {
    Running = 0,
    Done = 1,
    Error = 2,
}

impl JobStatus {
    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Running,
            1 => Self::Done,
            _ => Self::Error,
        }
    }

    pub fn is_terminal(self) -> bool {
        self != Self::Running
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Done => "done",
            Self::Error => "error",
        }
    }
}

/// One captured console line. Append-only once stored.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    /// Millisecond timestamp.
    pub ts: i64,
    pub level: LogLevel,
    pub message: String,
}

/// Incremental notification of a job's evolution. Exactly one `Done` or
/// `Error` terminates a job's stream; nothing is produced after it.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JobEvent {
    Log {
        ts: i64,
        level: LogLevel,
        message: String,
    },
    Progress {
        value: u8,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Done {
        result: Value,
    },
    Error {
        error: String,
    },
}

impl JobEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }

    /// SSE event name for this variant.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Log { .. } => "log",
            Self::Progress { .. } => "progress",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }
}

/// Point-in-time full readout of a job record, including the complete log
/// history — the export/report payload.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub action: String,
    pub params: Value,
    pub status: JobStatus,
    pub progress: u8,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub logs: Vec<LogEntry>,
}

/// Log-free listing row for the dashboard's job list.
#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub id: JobId,
    pub action: String,
    pub status: JobStatus,
    pub progress: u8,
    pub created_at: i64,
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_roundtrips_through_u8() {
        for status in [JobStatus::Running, JobStatus::Done, JobStatus::Error] {
            assert_eq!(JobStatus::from_u8(status as u8), status);
        }
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Done.is_terminal());
        assert!(JobStatus::Error.is_terminal());
    }

    #[test]
    fn events_serialize_tagged() {
        let event = JobEvent::Progress {
            value: 40,
            title: Some("installing".into()),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "progress");
        assert_eq!(value["value"], 40);
        assert_eq!(value["title"], "installing");

        let done = serde_json::to_value(JobEvent::Done {
            result: json!({"message": "ok"}),
        })
        .unwrap();
        assert_eq!(done["type"], "done");
        assert_eq!(done["result"]["message"], "ok");
    }

    #[test]
    fn progress_without_title_omits_field() {
        let json = serde_json::to_string(&JobEvent::Progress {
            value: 5,
            title: None,
        })
        .unwrap();
        assert!(!json.contains("title"));
    }

    #[test]
    fn terminal_event_detection() {
        assert!(JobEvent::Done { result: Value::Null }.is_terminal());
        assert!(JobEvent::Error { error: "x".into() }.is_terminal());
        assert!(!JobEvent::Progress { value: 1, title: None }.is_terminal());
        assert_eq!(JobEvent::Error { error: "x".into() }.name(), "error");
    }
}
