//! Job registry: the single source of truth for which jobs exist and what
//! state they are in.
//!
//! Every mutation happens under one write lock, so readers always see a whole
//! job record and a status report can never overwrite a terminal state that a
//! concurrent cancel already wrote.

use std::collections::HashMap;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, JobErrorDetail, Result};
use crate::types::{ArtifactHandle, Job, JobId, JobState, Progress, RemoteId, StatusReport};

/// Registry entry: the job plus its poll handle
#[derive(Debug)]
struct JobRecord {
    job: Job,
    /// Present iff the job is non-terminal
    poll: Option<CancellationToken>,
    /// Whether a poll task has taken ownership of `poll`
    claimed: bool,
}

impl JobRecord {
    fn snapshot(&self) -> Job {
        let mut job = self.job.clone();
        job.polling = self.poll.is_some();
        job
    }

    fn release_poll_handle(&mut self) {
        if let Some(token) = self.poll.take() {
            token.cancel();
        }
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    order: Vec<JobId>,
    jobs: HashMap<JobId, JobRecord>,
}

/// Result of applying a status report to a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Applied {
    /// The state changed
    Changed {
        from: JobState,
        to: JobState,
        progress: Option<Progress>,
    },
    /// Same state reported again; progress refreshed
    Refreshed { progress: Option<Progress> },
    /// Report would move the job backwards; ignored
    Ignored,
    /// Job is terminal or its poller was cancelled; the poller must stop
    Stale,
}

/// Result of a client-side cancel
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Revoked {
    /// Job moved to REVOKED
    Now {
        from: JobState,
        remote_id: Option<RemoteId>,
    },
    /// Job was already REVOKED
    Already,
}

/// Ordered, lock-protected collection of jobs
#[derive(Debug, Default)]
pub struct JobRegistry {
    inner: RwLock<RegistryInner>,
}

impl JobRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job
    ///
    /// Non-terminal jobs get a poll handle installed in the same critical
    /// section, so no reader ever observes an active job without one.
    pub async fn add(&self, job: Job) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.jobs.contains_key(&job.local_id) {
            return Err(Error::DuplicateJob(job.local_id));
        }
        let id = job.local_id;
        let poll = (!job.state.is_terminal()).then(CancellationToken::new);
        inner.jobs.insert(
            id,
            JobRecord {
                job,
                poll,
                claimed: false,
            },
        );
        inner.order.push(id);
        Ok(())
    }

    /// Snapshot of one job
    pub async fn get(&self, id: JobId) -> Option<Job> {
        self.inner.read().await.jobs.get(&id).map(JobRecord::snapshot)
    }

    /// Snapshots of every job in insertion order
    pub async fn all(&self) -> Vec<Job> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|id| inner.jobs.get(id).map(JobRecord::snapshot))
            .collect()
    }

    /// Remove a job, stopping its poller if one is running
    ///
    /// Returns [`Error::NotFound`] and leaves the registry untouched when the id
    /// is unknown.
    pub async fn remove(&self, id: JobId) -> Result<Job> {
        let mut inner = self.inner.write().await;
        let mut record = inner.jobs.remove(&id).ok_or(Error::NotFound(id))?;
        inner.order.retain(|other| *other != id);
        let snapshot = record.snapshot();
        record.release_poll_handle();
        Ok(snapshot)
    }

    /// Whether a job is registered
    pub async fn contains(&self, id: JobId) -> bool {
        self.inner.read().await.jobs.contains_key(&id)
    }

    /// Number of registered jobs
    pub async fn len(&self) -> usize {
        self.inner.read().await.jobs.len()
    }

    /// Whether the registry is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.jobs.is_empty()
    }

    /// Ids of jobs that still hold a poll handle
    pub(crate) async fn active_ids(&self) -> Vec<JobId> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter(|id| inner.jobs.get(*id).is_some_and(|r| r.poll.is_some()))
            .copied()
            .collect()
    }

    /// Hand the poll handle to a poll task; at most one claim per job
    pub(crate) async fn claim_poller(&self, id: JobId) -> Result<CancellationToken> {
        let mut inner = self.inner.write().await;
        let record = inner.jobs.get_mut(&id).ok_or(Error::NotFound(id))?;
        match (&record.poll, record.claimed) {
            (Some(token), false) => {
                record.claimed = true;
                Ok(token.clone())
            }
            _ => Err(Error::InvalidState {
                id,
                operation: "poll".to_string(),
                current_state: record.job.state,
            }),
        }
    }

    /// Record the backend task id; returns the job's state at that moment
    ///
    /// The id is written even if the job was cancelled meanwhile, so the caller
    /// can still tell the backend to stop.
    pub(crate) async fn set_remote_id(&self, id: JobId, remote_id: RemoteId) -> Result<JobState> {
        let mut inner = self.inner.write().await;
        let record = inner.jobs.get_mut(&id).ok_or(Error::NotFound(id))?;
        if let Some(existing) = &record.job.remote_id {
            if *existing != remote_id {
                return Err(Error::InvalidState {
                    id,
                    operation: "reassign remote id".to_string(),
                    current_state: record.job.state,
                });
            }
        } else {
            record.job.remote_id = Some(remote_id);
            record.job.updated_at = chrono::Utc::now();
        }
        Ok(record.job.state)
    }

    /// Apply a status report on behalf of the poller holding `token`
    pub(crate) async fn apply_report(
        &self,
        id: JobId,
        report: &StatusReport,
        token: &CancellationToken,
    ) -> Result<Applied> {
        let mut inner = self.inner.write().await;
        let record = inner.jobs.get_mut(&id).ok_or(Error::NotFound(id))?;

        if token.is_cancelled() || record.job.state.is_terminal() {
            return Ok(Applied::Stale);
        }

        let from = record.job.state;
        if !from.can_transition_to(report.state) {
            return Ok(Applied::Ignored);
        }

        let job = &mut record.job;
        job.progress = match report.state {
            JobState::Progress => report.progress.or(job.progress),
            _ => None,
        };
        if report.state == JobState::Failure {
            job.error = Some(JobErrorDetail::backend_failure(report.error.clone()));
        }
        job.state = report.state;
        job.updated_at = chrono::Utc::now();
        let progress = job.progress;

        if report.state.is_terminal() {
            record.release_poll_handle();
        }

        if from == report.state {
            Ok(Applied::Refreshed { progress })
        } else {
            Ok(Applied::Changed {
                from,
                to: report.state,
                progress,
            })
        }
    }

    /// Move a non-terminal job to FAILURE with the given detail
    ///
    /// Returns the previous state, or `None` if the job was already terminal.
    pub(crate) async fn fail(&self, id: JobId, detail: JobErrorDetail) -> Result<Option<JobState>> {
        let mut inner = self.inner.write().await;
        let record = inner.jobs.get_mut(&id).ok_or(Error::NotFound(id))?;
        let from = record.job.state;
        if from.is_terminal() {
            return Ok(None);
        }
        record.job.state = JobState::Failure;
        record.job.progress = None;
        record.job.error = Some(detail);
        record.job.updated_at = chrono::Utc::now();
        record.release_poll_handle();
        Ok(Some(from))
    }

    /// Force a job to REVOKED and stop its poller
    pub(crate) async fn revoke(&self, id: JobId) -> Result<Revoked> {
        let mut inner = self.inner.write().await;
        let record = inner.jobs.get_mut(&id).ok_or(Error::NotFound(id))?;
        let from = record.job.state;
        match from {
            JobState::Revoked => Ok(Revoked::Already),
            JobState::Success | JobState::Failure => Err(Error::InvalidState {
                id,
                operation: "cancel".to_string(),
                current_state: from,
            }),
            JobState::Pending | JobState::Progress => {
                record.job.state = JobState::Revoked;
                record.job.progress = None;
                record.job.updated_at = chrono::Utc::now();
                record.release_poll_handle();
                Ok(Revoked::Now {
                    from,
                    remote_id: record.job.remote_id.clone(),
                })
            }
        }
    }

    /// Record the output preview handle
    pub(crate) async fn set_output_preview(&self, id: JobId, handle: ArtifactHandle) -> Result<()> {
        let mut inner = self.inner.write().await;
        let record = inner.jobs.get_mut(&id).ok_or(Error::NotFound(id))?;
        record.job.previews.output = Some(handle);
        Ok(())
    }
}
