//! JSON bodies exchanged with the backend.
//!
//! Two backend generations are in the wild. The older one answers status
//! queries with `{"state": "PROGRESS", "info": {"n": 2, "total": 10}}`; the newer
//! one with `{"status": "processing", "error": "..."}` plus a log list. Both are
//! accepted here and normalized into [`StatusReport`].

use serde::Deserialize;

use crate::types::{JobState, Progress, RemoteId, StatusReport};

#[derive(Debug, Deserialize)]
pub(crate) struct TaskCreated {
    #[serde(alias = "task_id")]
    pub(crate) id: String,
}

impl From<TaskCreated> for RemoteId {
    fn from(created: TaskCreated) -> Self {
        RemoteId(created.id)
    }
}

#[derive(Debug, Deserialize)]
struct RawInfo {
    n: u64,
    total: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawStatus {
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    info: Option<RawInfo>,
    #[serde(default)]
    error: Option<String>,
}

impl RawStatus {
    /// Normalize into a report; `None` when no recognizable state is present
    pub(crate) fn into_report(self) -> Option<StatusReport> {
        let state = self
            .state
            .as_deref()
            .or(self.status.as_deref())
            .and_then(JobState::from_wire)?;

        let progress = match (state, self.info) {
            (JobState::Progress, Some(info)) => Some(Progress::new(info.n, info.total)),
            _ => None,
        };
        let error = match state {
            JobState::Failure | JobState::Revoked => self.error,
            _ => None,
        };

        Some(StatusReport {
            state,
            progress,
            error,
        })
    }
}
