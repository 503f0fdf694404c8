// crates/server/src/jobs/capture.rs
//! Bridge from collaborator console output to the job's event stream.
//!
//! Collaborators write through the `Console` trait; this implementation
//! lands every line in the record's log history *and* on the event
//! channel, scoped strictly to the owning job — two jobs capturing
//! subprocess output concurrently never see each other's lines.

use std::sync::Arc;

use netboost_core::{Console, LogLevel};

use super::record::JobRecord;

pub struct EventConsole {
    record: Arc<JobRecord>,
}

impl EventConsole {
    pub fn new(record: Arc<JobRecord>) -> Self {
        Self { record }
    }
}

impl Console for EventConsole {
    fn log(&self, level: LogLevel, message: &str) {
        self.record.push_log(level, message);
    }

    fn progress(&self, value: u8, title: Option<&str>) {
        self.record.set_progress(value, title);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::channel::Polled;
    use crate::jobs::types::{JobEvent, JobStatus};
    use netboost_core::AnsiLineBuffer;
    use serde_json::json;
    use std::time::Duration;

    fn record() -> Arc<JobRecord> {
        Arc::new(JobRecord::new("job-c".into(), "create_venv".into(), json!({})))
    }

    #[tokio::test]
    async fn captured_subprocess_output_becomes_log_events() {
        let rec = record();
        let mut reader = rec.subscribe();
        let console = EventConsole::new(Arc::clone(&rec));

        // A collaborator printing three lines: one normal, one blank, one
        // wrapped in color escapes.
        let mut buf = AnsiLineBuffer::new();
        for line in buf.feed(b"creating venv\n\n\x1b[92minstalling deps\x1b[0m\n") {
            console.info(&line);
        }
        assert!(buf.finish().is_none());

        let mut seen = Vec::new();
        for _ in 0..2 {
            match reader.poll(Duration::from_secs(1)).await {
                Polled::Event(JobEvent::Log { message, .. }) => seen.push(message),
                other => panic!("unexpected poll result: {other:?}"),
            }
        }
        assert_eq!(seen, vec!["creating venv", "installing deps"]);

        // The same two lines are in the snapshot history for late readers.
        let logs = rec.snapshot().logs;
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[1].message, "installing deps");
    }

    #[test]
    fn progress_flows_into_the_record() {
        let rec = record();
        let console = EventConsole::new(Arc::clone(&rec));
        console.progress(20, Some("creating environment"));
        assert_eq!(rec.progress(), 20);
        assert_eq!(rec.status(), JobStatus::Running);
    }
}
