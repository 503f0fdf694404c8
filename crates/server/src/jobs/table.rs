// crates/server/src/jobs/table.rs
//! Process-wide job registry.
//!
//! The table lock covers structural mutation only (insert, lookup, list).
//! Event emission and log appends on an already-created job go through the
//! record's own synchronization and never hold this lock, so a chatty job
//! cannot stall job creation or other jobs' readers.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;
use uuid::Uuid;

use super::record::JobRecord;
use super::types::{JobId, JobSummary};

pub struct JobTable {
    jobs: RwLock<HashMap<JobId, Arc<JobRecord>>>,
}

impl JobTable {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Allocate a fresh record (status running, progress 0, empty logs)
    /// under a new unique id. Callers validate the action *before* this —
    /// no record is ever created for an unknown action.
    pub fn create(&self, action: &str, params: Value) -> Arc<JobRecord> {
        let id = Uuid::new_v4().to_string();
        let record = Arc::new(JobRecord::new(id.clone(), action.to_string(), params));
        match self.jobs.write() {
            Ok(mut jobs) => {
                jobs.insert(id, Arc::clone(&record));
            }
            Err(e) => tracing::error!("job table lock poisoned on create: {e}"),
        }
        record
    }

    pub fn get(&self, id: &str) -> Option<Arc<JobRecord>> {
        match self.jobs.read() {
            Ok(jobs) => jobs.get(id).cloned(),
            Err(e) => {
                tracing::error!("job table lock poisoned on get: {e}");
                None
            }
        }
    }

    /// All jobs, newest first.
    pub fn summaries(&self) -> Vec<JobSummary> {
        let mut rows: Vec<JobSummary> = match self.jobs.read() {
            Ok(jobs) => jobs.values().map(|r| r.summary()).collect(),
            Err(e) => {
                tracing::error!("job table lock poisoned on list: {e}");
                Vec::new()
            }
        };
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows
    }

    pub fn len(&self) -> usize {
        self.jobs.read().map(|j| j.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for JobTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn create_then_get_roundtrips() {
        let table = JobTable::new();
        let record = table.create("apply_config", json!({"module": "git"}));
        let found = table.get(record.id()).expect("job should be registered");
        assert_eq!(found.action(), "apply_config");
        assert_eq!(found.params()["module"], "git");
    }

    #[test]
    fn unknown_id_is_none() {
        let table = JobTable::new();
        assert!(table.get("no-such-job").is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn ids_are_unique_across_concurrent_creates() {
        let table = Arc::new(JobTable::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let t = Arc::clone(&table);
                std::thread::spawn(move || {
                    (0..25)
                        .map(|_| t.create("update_hosts", json!({})).id().clone())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            for id in handle.join().expect("thread panicked") {
                assert!(ids.insert(id), "duplicate job id");
            }
        }
        assert_eq!(ids.len(), 200);
        assert_eq!(table.len(), 200);
    }

    #[test]
    fn summaries_are_newest_first() {
        let table = JobTable::new();
        for _ in 0..5 {
            table.create("apply_config", json!({}));
        }
        let rows = table.summaries();
        assert_eq!(rows.len(), 5);
        for pair in rows.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
    }
}
