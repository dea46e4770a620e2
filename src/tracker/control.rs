//! Job control: cancel, remove, shutdown.

use std::sync::atomic::Ordering;

use crate::error::{Error, Result};
use crate::types::{Event, Job, JobId, JobState, RemoteId};

use super::JobTracker;
use super::registry::Revoked;

impl JobTracker {
    /// Cancel a job
    ///
    /// Forces the job to REVOKED and stops its poller, whatever the backend
    /// currently reports. A status result that arrives after this call is
    /// discarded, so the job stays REVOKED even if the backend finishes it.
    /// When `cancel_remote` is enabled and the job already has a remote id, the
    /// backend is asked to stop the task as well (best effort, in the
    /// background).
    ///
    /// Cancelling a REVOKED job is a no-op.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the job does not exist
    /// - [`Error::InvalidState`] if the job already ended in SUCCESS or FAILURE
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use pdftrans::*;
    /// # async fn example(tracker: JobTracker, id: JobId) -> Result<()> {
    /// let job = tracker.cancel(id).await?;
    /// assert_eq!(job.state, JobState::Revoked);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn cancel(&self, id: JobId) -> Result<Job> {
        match self.registry.revoke(id).await? {
            Revoked::Now { from, remote_id } => {
                tracing::info!(job_id = %id, from = %from, "job cancelled");
                self.emit_event(Event::StateChanged {
                    id,
                    from,
                    to: JobState::Revoked,
                });
                self.emit_event(Event::Cancelled { id });

                if let Some(remote_id) = remote_id {
                    if self.config.cancel_remote {
                        self.spawn_remote_cancel(id, remote_id);
                    }
                }
            }
            Revoked::Already => {
                tracing::debug!(job_id = %id, "job already cancelled");
            }
        }

        self.registry.get(id).await.ok_or(Error::NotFound(id))
    }

    /// Remove a job from the tracker
    ///
    /// An active job is cancelled first. Returns the job's last snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the job does not exist; the registry is
    /// left unchanged.
    pub async fn remove(&self, id: JobId) -> Result<Job> {
        match self.cancel(id).await {
            Ok(_) | Err(Error::InvalidState { .. }) => {}
            Err(e) => return Err(e),
        }

        let job = self.registry.remove(id).await?;
        tracing::info!(job_id = %id, state = %job.state, "job removed");
        self.emit_event(Event::Removed { id });
        Ok(job)
    }

    /// Stop accepting new jobs and cancel every active one
    ///
    /// Finished jobs stay in the registry for inspection.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("shutting down job tracker");
        self.accepting_new.store(false, Ordering::SeqCst);

        for id in self.registry.active_ids().await {
            match self.cancel(id).await {
                // Finished or removed between listing and cancelling
                Ok(_) | Err(Error::InvalidState { .. }) | Err(Error::NotFound(_)) => {}
                Err(e) => {
                    tracing::warn!(job_id = %id, error = %e, "failed to cancel job during shutdown");
                }
            }
        }

        Ok(())
    }

    /// Ask the backend to cancel a task without waiting for the answer
    pub(crate) fn spawn_remote_cancel(&self, id: JobId, remote_id: RemoteId) {
        let backend = std::sync::Arc::clone(&self.backend);
        let timeout = self.config.poll.request_timeout;
        tokio::spawn(async move {
            match tokio::time::timeout(timeout, backend.cancel(&remote_id)).await {
                Ok(Ok(())) => {
                    tracing::debug!(job_id = %id, remote_id = %remote_id, "remote task cancelled");
                }
                Ok(Err(e)) => {
                    tracing::warn!(job_id = %id, remote_id = %remote_id, error = %e, "remote cancel failed");
                }
                Err(_) => {
                    tracing::warn!(job_id = %id, remote_id = %remote_id, "remote cancel timed out");
                }
            }
        });
    }
}
