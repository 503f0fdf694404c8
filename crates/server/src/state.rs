// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::Serialize;

use crate::jobs::JobTable;

/// One completed environment install, shown on the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct RecentEnv {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// "venv" or "conda".
    pub kind: String,
    pub created_at: i64,
}

/// Process-wide list of recent environment installs. Appended to by
/// multiple job workers concurrently, so it carries its own lock —
/// deliberately distinct from the job table's.
pub type RecentEnvList = Arc<Mutex<Vec<RecentEnv>>>;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Registry of all jobs started this process.
    pub jobs: JobTable,
    /// Recent environment installs (newest appended last).
    pub recent_envs: RecentEnvList,
}

impl AppState {
    /// Create a new application state wrapped in an Arc for sharing.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            jobs: JobTable::new(),
            recent_envs: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Recent env installs, newest first.
    pub fn recent_envs(&self) -> Vec<RecentEnv> {
        let mut list = match self.recent_envs.lock() {
            Ok(guard) => guard.clone(),
            Err(e) => {
                tracing::error!("recent-envs lock poisoned: {e}");
                Vec::new()
            }
        };
        list.reverse();
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_empty() {
        let state = AppState::new();
        assert!(state.jobs.is_empty());
        assert!(state.recent_envs().is_empty());
        assert!(state.uptime_secs() < 5);
    }

    #[test]
    fn recent_envs_are_newest_first() {
        let state = AppState::new();
        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            state.recent_envs.lock().unwrap().push(RecentEnv {
                name: name.to_string(),
                path: None,
                kind: "venv".into(),
                created_at: i as i64,
            });
        }
        let listed = state.recent_envs();
        assert_eq!(listed[0].name, "c");
        assert_eq!(listed[2].name, "a");
    }
}
