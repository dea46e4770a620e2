//! Per-job status polling.
//!
//! One poll loop runs per job, inside the job's own task, holding the job's
//! cancellation token. Only one status query is ever in flight per job. The
//! loop ends when the registry reports the job terminal, when the token is
//! cancelled, or when the job disappears.

use tokio_util::sync::CancellationToken;

use crate::error::{Error, JobErrorDetail};
use crate::retry::Backoff;
use crate::types::{Event, JobId, JobState, RemoteId};

use super::JobTracker;
use super::registry::Applied;

impl JobTracker {
    /// Poll the backend for `remote_id` until the job reaches a terminal state
    ///
    /// Status query failures never change the job's state. While they persist,
    /// the wait between queries grows along the retry back-off curve (never
    /// below the poll interval) and drops back to the interval after the next
    /// successful query. With `retry.max_consecutive_poll_failures` set, the
    /// job is failed once that many queries in a row have failed.
    pub(crate) async fn poll_until_terminal(
        &self,
        id: JobId,
        remote_id: RemoteId,
        token: CancellationToken,
    ) {
        let interval = self.config.poll.interval;
        let request_timeout = self.config.poll.request_timeout;
        let mut backoff = Backoff::new(&self.config.retry);
        let mut failures: u32 = 0;
        let mut delay = interval;

        tracing::debug!(job_id = %id, remote_id = %remote_id, "polling started");

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }

            let query = tokio::time::timeout(request_timeout, self.backend.status(&remote_id));
            let result = tokio::select! {
                _ = token.cancelled() => break,
                result = query => match result {
                    Ok(result) => result,
                    Err(_) => Err(Error::Timeout(request_timeout)),
                },
            };

            match result {
                Ok(report) => {
                    failures = 0;
                    backoff.reset();
                    delay = interval;

                    match self.registry.apply_report(id, &report, &token).await {
                        Ok(Applied::Changed { from, to, progress }) => {
                            tracing::info!(job_id = %id, from = %from, to = %to, "job state changed");
                            self.emit_event(Event::StateChanged { id, from, to });
                            if let Some(p) = progress {
                                self.emit_event(Event::Progress {
                                    id,
                                    current: p.current,
                                    total: p.total,
                                });
                            }
                            match to {
                                JobState::Failure => self.emit_failed(id).await,
                                JobState::Revoked => self.emit_event(Event::Cancelled { id }),
                                _ => {}
                            }
                            if to.is_terminal() {
                                break;
                            }
                        }
                        Ok(Applied::Refreshed { progress }) => {
                            if let Some(p) = progress {
                                tracing::trace!(job_id = %id, current = p.current, total = p.total, "progress");
                                self.emit_event(Event::Progress {
                                    id,
                                    current: p.current,
                                    total: p.total,
                                });
                            }
                        }
                        Ok(Applied::Ignored) => {
                            tracing::debug!(
                                job_id = %id,
                                reported = %report.state,
                                "ignoring status report that would move the job backwards"
                            );
                        }
                        Ok(Applied::Stale) => {
                            tracing::debug!(job_id = %id, "discarding status report for a finished job");
                            break;
                        }
                        Err(e) => {
                            tracing::debug!(job_id = %id, error = %e, "job removed while polling");
                            break;
                        }
                    }
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    tracing::warn!(
                        job_id = %id,
                        remote_id = %remote_id,
                        error = %e,
                        consecutive_failures = failures,
                        "status query failed"
                    );

                    if let Some(limit) = self.config.retry.max_consecutive_poll_failures {
                        if failures >= limit {
                            self.give_up_polling(id, failures, &e).await;
                            break;
                        }
                    }

                    delay = backoff.next_delay().max(interval);
                }
            }
        }

        tracing::debug!(job_id = %id, "polling stopped");
    }

    async fn give_up_polling(&self, id: JobId, failures: u32, last_error: &Error) {
        tracing::error!(
            job_id = %id,
            consecutive_failures = failures,
            error = %last_error,
            "giving up on status queries"
        );
        let detail = JobErrorDetail::poll_exhausted(failures, last_error);
        if let Ok(Some(from)) = self.registry.fail(id, detail.clone()).await {
            self.emit_event(Event::StateChanged {
                id,
                from,
                to: JobState::Failure,
            });
            self.emit_event(Event::Failed { id, error: detail });
        }
    }

    async fn emit_failed(&self, id: JobId) {
        if let Some(error) = self.registry.get(id).await.and_then(|job| job.error) {
            tracing::warn!(job_id = %id, error = %error.message, "backend reported failure");
            self.emit_event(Event::Failed { id, error });
        }
    }
}
