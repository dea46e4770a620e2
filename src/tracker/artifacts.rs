//! Artifact resolution and retrieval for finished jobs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::retry::with_retry;
use crate::types::{ArtifactHandle, ArtifactKind, ArtifactSet, Job, JobId, JobState};

use super::JobTracker;

impl JobTracker {
    /// Handles to the combined, mono and dual results of a successful job
    ///
    /// Resolving is cheap and never downloads anything; calling it again
    /// returns equal handles. As a side effect the job's output preview is set
    /// to the mono handle.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the job does not exist
    /// - [`Error::NotReady`] if the job is in any state other than SUCCESS
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use pdftrans::*;
    /// # async fn example(tracker: JobTracker, id: JobId) -> Result<()> {
    /// let artifacts = tracker.resolve_artifacts(id).await?;
    /// let pdf = tracker.download_artifact(&artifacts.dual).await?;
    /// std::fs::write("paper.dual.pdf", pdf)?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn resolve_artifacts(&self, id: JobId) -> Result<ArtifactSet> {
        let job = self.registry.get(id).await.ok_or(Error::NotFound(id))?;
        if job.state != JobState::Success {
            return Err(Error::NotReady {
                id,
                state: job.state,
            });
        }
        // A SUCCESS job always went through submission
        let remote_id = job.remote_id.ok_or(Error::NotReady {
            id,
            state: job.state,
        })?;

        let handle = |kind| ArtifactHandle {
            job_id: id,
            remote_id: remote_id.clone(),
            kind,
            url: self.backend.artifact_url(&remote_id, kind),
        };
        let artifacts = ArtifactSet {
            combined: handle(ArtifactKind::Combined),
            mono: handle(ArtifactKind::Mono),
            dual: handle(ArtifactKind::Dual),
        };

        self.registry
            .set_output_preview(id, artifacts.mono.clone())
            .await?;

        Ok(artifacts)
    }

    /// Fetch an artifact's bytes
    ///
    /// Transient transport failures are retried with the configured back-off.
    pub async fn download_artifact(&self, handle: &ArtifactHandle) -> Result<Vec<u8>> {
        tracing::debug!(
            job_id = %handle.job_id,
            remote_id = %handle.remote_id,
            kind = ?handle.kind,
            "downloading artifact"
        );
        let bytes = with_retry(&self.config.retry, || {
            self.backend.download(&handle.remote_id, handle.kind)
        })
        .await?;
        tracing::info!(
            job_id = %handle.job_id,
            kind = ?handle.kind,
            bytes = bytes.len(),
            "artifact downloaded"
        );
        Ok(bytes)
    }

    /// Download an artifact into `dir`, named after the job's source file
    ///
    /// Returns the path written.
    pub async fn save_artifact(&self, handle: &ArtifactHandle, dir: &Path) -> Result<PathBuf> {
        let job = self
            .registry
            .get(handle.job_id)
            .await
            .ok_or(Error::NotFound(handle.job_id))?;
        let bytes = self.download_artifact(handle).await?;

        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(artifact_file_name(job.name(), handle.kind));
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write '{}': {}", path.display(), e),
            ))
        })?;
        Ok(path)
    }

    /// Wait for a job to finish and resolve its artifacts
    ///
    /// Maps the terminal state to an outcome: SUCCESS yields the artifact set,
    /// FAILURE yields [`Error::Submission`] or [`Error::BackendFailure`]
    /// depending on where it failed, and REVOKED yields [`Error::Cancelled`].
    pub async fn wait_for_artifacts(&self, id: JobId, timeout: Duration) -> Result<ArtifactSet> {
        let job = self.wait_for_terminal(id, timeout).await?;
        match job.state {
            JobState::Success => self.resolve_artifacts(id).await,
            JobState::Revoked => Err(Error::Cancelled(id)),
            JobState::Failure => Err(failure_error(&job)),
            JobState::Pending | JobState::Progress => Err(Error::NotReady {
                id,
                state: job.state,
            }),
        }
    }
}

fn failure_error(job: &Job) -> Error {
    let (code, message) = job
        .error
        .as_ref()
        .map(|e| (e.code.as_str(), e.message.clone()))
        .unwrap_or(("backend_failure", "backend reported failure".to_string()));
    match code {
        "submission_failed" => Error::Submission(message),
        _ => Error::BackendFailure {
            id: job.local_id,
            message,
        },
    }
}

/// File name for a downloaded artifact
///
/// `paper.pdf` becomes `paper.mono.pdf`, `paper.dual.pdf`, or
/// `paper.translated.pdf` for the combined result.
pub fn artifact_file_name(source_name: &str, kind: ArtifactKind) -> String {
    let stem = Path::new(source_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string());
    let label = match kind {
        ArtifactKind::Combined => "translated",
        ArtifactKind::Mono => "mono",
        ArtifactKind::Dual => "dual",
    };
    format!("{stem}.{label}.pdf")
}
