//! Job submission: register a PENDING job, send it to the backend, hand it to the poller.

use std::sync::atomic::Ordering;

use crate::backend::TranslateSource;
use crate::config::SubmitMode;
use crate::error::{Error, JobErrorDetail, Result};
use crate::types::{
    BackendCatalog, Event, Job, JobId, JobState, RemoteId, SourceFile, TranslateParams,
    UploadReceipt,
};

use super::JobTracker;

impl JobTracker {
    /// Submit a document for translation
    ///
    /// The job is registered as PENDING and returned immediately; the upload,
    /// translate request and status polling all run on a background task. A
    /// rejected or failed submission moves the job to FAILURE with a
    /// `submission_failed` detail. There is no automatic resubmission: call
    /// `submit` again to retry.
    ///
    /// `params` travel to the backend untouched (service, `lang_from`,
    /// `lang_to`, provider credentials, ...).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShuttingDown`] once [`shutdown`](JobTracker::shutdown)
    /// has been called. Backend errors are never returned here; they land on
    /// the job.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use pdftrans::*;
    /// # async fn example(tracker: JobTracker) -> Result<()> {
    /// let file = SourceFile::from_path("paper.pdf").await?;
    /// let params = TranslateParams::new()
    ///     .with("service", "OpenAI")
    ///     .with("lang_from", "en")
    ///     .with("lang_to", "zh");
    /// let job = tracker.submit(file, params).await?;
    /// println!("job {} is {}", job.local_id, job.state);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn submit(&self, file: SourceFile, params: TranslateParams) -> Result<Job> {
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let id = self.next_job_id();
        let job = Job::new(id, file);
        let name = job.name().to_string();
        self.registry.add(job).await?;
        // Claimed before the task exists so a second poller can never attach
        let token = self.registry.claim_poller(id).await?;
        let snapshot = self.registry.get(id).await.ok_or(Error::NotFound(id))?;

        tracing::info!(job_id = %id, name = %name, "job submitted");
        self.emit_event(Event::Submitted { id, name });

        let tracker = self.clone();
        let source = snapshot.source.clone();
        tokio::spawn(async move {
            tracker.run_job(id, source, params, token).await;
        });

        Ok(snapshot)
    }

    /// Submit several documents as independent jobs
    ///
    /// Each file gets its own job and its own outcome; one failed submission
    /// does not affect the others. Results are in input order.
    pub async fn submit_many(
        &self,
        files: Vec<SourceFile>,
        params: TranslateParams,
    ) -> Vec<Result<Job>> {
        let submissions = files
            .into_iter()
            .map(|file| self.submit(file, params.clone()));
        futures::future::join_all(submissions).await
    }

    /// Upload a document without starting a translation
    pub async fn upload(&self, file: &SourceFile) -> Result<UploadReceipt> {
        self.backend.upload(file).await
    }

    /// Fetch the backend's language and service catalog
    pub async fn backend_catalog(&self) -> Result<BackendCatalog> {
        self.backend.catalog().await
    }

    /// Body of the per-job task: submit, then poll until terminal
    async fn run_job(
        &self,
        id: JobId,
        source: SourceFile,
        params: TranslateParams,
        token: tokio_util::sync::CancellationToken,
    ) {
        let remote_id = match self.submit_remote(&source, &params).await {
            Ok(remote_id) => remote_id,
            Err(e) => {
                self.record_submission_failure(id, &e).await;
                return;
            }
        };

        let state = match self.registry.set_remote_id(id, remote_id.clone()).await {
            Ok(state) => state,
            Err(e) => {
                // Removed while the submission was in flight
                tracing::debug!(job_id = %id, error = %e, "job gone before remote id was recorded");
                if self.config.cancel_remote {
                    self.spawn_remote_cancel(id, remote_id);
                }
                return;
            }
        };

        match state {
            JobState::Pending | JobState::Progress => {
                tracing::info!(job_id = %id, remote_id = %remote_id, "job accepted by backend");
                self.emit_event(Event::Started {
                    id,
                    remote_id: remote_id.clone(),
                });
                self.poll_until_terminal(id, remote_id, token).await;
            }
            JobState::Revoked => {
                // Cancelled while the submission was in flight
                tracing::info!(job_id = %id, remote_id = %remote_id, "job cancelled during submission");
                if self.config.cancel_remote {
                    self.spawn_remote_cancel(id, remote_id);
                }
            }
            JobState::Success | JobState::Failure => {}
        }
    }

    /// Send the document to the backend according to the configured submit mode
    async fn submit_remote(
        &self,
        source: &SourceFile,
        params: &TranslateParams,
    ) -> Result<RemoteId> {
        match self.config.submit_mode {
            SubmitMode::Inline => {
                self.backend
                    .translate(TranslateSource::Inline(source), params)
                    .await
            }
            SubmitMode::UploadFirst => {
                let receipt = self.backend.upload(source).await?;
                tracing::debug!(file_id = %receipt.file_id, "document uploaded");
                self.backend
                    .translate(TranslateSource::Uploaded(&receipt), params)
                    .await
            }
        }
    }

    async fn record_submission_failure(&self, id: JobId, err: &Error) {
        tracing::warn!(job_id = %id, error = %err, "submission failed");
        let detail = JobErrorDetail::submission(err);
        match self.registry.fail(id, detail.clone()).await {
            Ok(Some(from)) => {
                self.emit_event(Event::StateChanged {
                    id,
                    from,
                    to: JobState::Failure,
                });
                self.emit_event(Event::Failed { id, error: detail });
            }
            // Already cancelled or removed; the failure is moot
            Ok(None) | Err(_) => {}
        }
    }
}
