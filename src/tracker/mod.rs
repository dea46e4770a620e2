//! Job tracker split into focused submodules.
//!
//! The `JobTracker` struct and its methods are organized by concern:
//! - [`registry`] - Job storage and the state transition gate
//! - [`submit`] - Turning local files into registered, submitted jobs
//! - [`poller`] - Per-job status polling until a terminal state
//! - [`control`] - Cancel, remove and shutdown
//! - [`artifacts`] - Resolving and downloading result documents

mod artifacts;
mod control;
mod poller;
mod registry;
mod submit;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use artifacts::artifact_file_name;
pub use registry::JobRegistry;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crate::backend::{Backend, HttpBackend};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{Event, Job, JobId};

/// Buffered events per subscriber before it starts lagging
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Client-side tracker for translation jobs (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct JobTracker {
    /// Remote job service
    pub(crate) backend: Arc<dyn Backend>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Every job this tracker knows about
    pub(crate) registry: Arc<JobRegistry>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Source of local job ids
    pub(crate) next_id: Arc<AtomicU64>,
    /// Cleared during shutdown
    pub(crate) accepting_new: Arc<AtomicBool>,
}

impl JobTracker {
    /// Create a tracker talking to the HTTP backend at `config.base_url`
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let backend = HttpBackend::new(&config)?;
        tracing::info!(base_url = %config.base_url, "job tracker initialized");
        Ok(Self::with_backend(config, Arc::new(backend)))
    }

    /// Create a tracker over any [`Backend`] implementation
    pub fn with_backend(config: Config, backend: Arc<dyn Backend>) -> Self {
        let (event_tx, _rx) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            backend,
            config: Arc::new(config),
            registry: Arc::new(JobRegistry::new()),
            event_tx,
            next_id: Arc::new(AtomicU64::new(1)),
            accepting_new: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Subscribe to job events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events
    /// independently; one that falls more than 1000 events behind gets
    /// `RecvError::Lagged`.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Current configuration
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// The job registry
    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Snapshot of one job
    pub async fn job(&self, id: JobId) -> Option<Job> {
        self.registry.get(id).await
    }

    /// Snapshots of every job in submission order
    pub async fn jobs(&self) -> Vec<Job> {
        self.registry.all().await
    }

    /// Wait until a job reaches a terminal state
    ///
    /// Returns the terminal snapshot, [`Error::NotFound`] if the job is (or
    /// becomes) unknown, or [`Error::Timeout`] when `timeout` elapses first.
    pub async fn wait_for_terminal(&self, id: JobId, timeout: Duration) -> Result<Job> {
        let mut events = self.subscribe();
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let job = self.registry.get(id).await.ok_or(Error::NotFound(id))?;
            if job.state.is_terminal() {
                return Ok(job);
            }

            match tokio::time::timeout_at(deadline, events.recv()).await {
                Err(_) => return Err(Error::Timeout(timeout)),
                Ok(Ok(_)) | Ok(Err(tokio::sync::broadcast::error::RecvError::Lagged(_))) => {}
                Ok(Err(tokio::sync::broadcast::error::RecvError::Closed)) => {
                    return Err(Error::ShuttingDown);
                }
            }
        }
    }

    pub(crate) fn next_job_id(&self) -> JobId {
        JobId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Emit an event to all subscribers
    ///
    /// Events sent while nobody is subscribed are dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}

impl std::fmt::Debug for JobTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobTracker")
            .field("backend", &self.backend.name())
            .field("base_url", &self.config.base_url)
            .finish()
    }
}
