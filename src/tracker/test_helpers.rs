//! Shared test helpers: a scripted in-memory backend and fast tracker configs.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::{Backend, TranslateSource};
use crate::config::{Config, PollConfig, RetryConfig};
use crate::error::{Error, Result};
use crate::tracker::JobTracker;
use crate::types::{
    ArtifactKind, BackendCatalog, RemoteId, SourceFile, StatusReport, TranslateParams,
    UploadReceipt,
};

/// One scripted answer of the status endpoint
#[derive(Clone, Debug)]
pub(crate) enum Step {
    /// Answer with this report
    Report(StatusReport),
    /// Answer with this report after a delay
    Slow(Duration, StatusReport),
    /// Fail the query with a transient error
    Fail,
}

/// Backend whose answers are scripted per source file name
///
/// The remote id of a job is `task-{file name}`. Each status query pops the
/// next step of that task's script; the last step repeats forever. A task
/// without a script stays PENDING.
#[derive(Default)]
pub(crate) struct ScriptedBackend {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    rejected: HashSet<String>,
    translate_delay: Duration,
    failing_downloads: AtomicU32,
    pub(crate) translate_calls: Mutex<Vec<(String, TranslateParams, bool)>>,
    pub(crate) upload_calls: AtomicU32,
    pub(crate) status_calls: Mutex<HashMap<String, u32>>,
    pub(crate) download_calls: AtomicU32,
    pub(crate) cancelled: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Script the status answers for the task created from `name`
    pub(crate) fn script(self, name: &str, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(remote_id_for(name).0, steps.into());
        self
    }

    /// Make the translate request for `name` fail with a 400
    pub(crate) fn reject(mut self, name: &str) -> Self {
        self.rejected.insert(name.to_string());
        self
    }

    /// Delay every translate request
    pub(crate) fn with_translate_delay(mut self, delay: Duration) -> Self {
        self.translate_delay = delay;
        self
    }

    /// Fail the next `n` downloads with a 503
    pub(crate) fn with_failing_downloads(self, n: u32) -> Self {
        self.failing_downloads.store(n, Ordering::SeqCst);
        self
    }

    pub(crate) fn status_calls_for(&self, name: &str) -> u32 {
        self.status_calls
            .lock()
            .unwrap()
            .get(remote_id_for(name).as_str())
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn cancelled_tasks(&self) -> Vec<String> {
        self.cancelled.lock().unwrap().clone()
    }
}

pub(crate) fn remote_id_for(name: &str) -> RemoteId {
    RemoteId::new(format!("task-{name}"))
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn upload(&self, file: &SourceFile) -> Result<UploadReceipt> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        Ok(UploadReceipt {
            file_id: format!("file-{}", file.name),
            filename: Some(file.name.clone()),
            path: None,
        })
    }

    async fn translate(
        &self,
        source: TranslateSource<'_>,
        params: &TranslateParams,
    ) -> Result<RemoteId> {
        let (name, uploaded) = match source {
            TranslateSource::Inline(file) => (file.name.clone(), false),
            TranslateSource::Uploaded(receipt) => (
                receipt
                    .filename
                    .clone()
                    .unwrap_or_else(|| receipt.file_id.clone()),
                true,
            ),
        };
        self.translate_calls
            .lock()
            .unwrap()
            .push((name.clone(), params.clone(), uploaded));

        if !self.translate_delay.is_zero() {
            tokio::time::sleep(self.translate_delay).await;
        }
        if self.rejected.contains(&name) {
            return Err(Error::Api {
                status: 400,
                body: format!("rejected {name}"),
            });
        }
        Ok(remote_id_for(&name))
    }

    async fn status(&self, remote_id: &RemoteId) -> Result<StatusReport> {
        *self
            .status_calls
            .lock()
            .unwrap()
            .entry(remote_id.0.clone())
            .or_default() += 1;

        let step = {
            let mut scripts = self.scripts.lock().unwrap();
            match scripts.get_mut(remote_id.as_str()) {
                Some(steps) if steps.len() > 1 => steps.pop_front(),
                Some(steps) => steps.front().cloned(),
                None => None,
            }
        };

        match step {
            None => Ok(StatusReport::new(crate::types::JobState::Pending)),
            Some(Step::Report(report)) => Ok(report),
            Some(Step::Slow(delay, report)) => {
                tokio::time::sleep(delay).await;
                Ok(report)
            }
            Some(Step::Fail) => Err(Error::PollTransient {
                remote_id: remote_id.0.clone(),
                reason: "scripted failure".to_string(),
            }),
        }
    }

    async fn catalog(&self) -> Result<BackendCatalog> {
        Ok(BackendCatalog {
            services: vec!["OpenAI".to_string()],
            ..BackendCatalog::default()
        })
    }

    async fn cancel(&self, remote_id: &RemoteId) -> Result<()> {
        self.cancelled.lock().unwrap().push(remote_id.0.clone());
        Ok(())
    }

    async fn download(&self, remote_id: &RemoteId, kind: ArtifactKind) -> Result<Vec<u8>> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failing_downloads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(Error::Api {
                status: 503,
                body: "busy".to_string(),
            });
        }
        Ok(format!("{}{}", remote_id, kind.path_suffix()).into_bytes())
    }

    fn artifact_url(&self, remote_id: &RemoteId, kind: ArtifactKind) -> String {
        format!("mem://{}{}", remote_id, kind.path_suffix())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Config with millisecond timings and no jitter
pub(crate) fn fast_config() -> Config {
    Config {
        poll: PollConfig {
            interval: Duration::from_millis(10),
            request_timeout: Duration::from_millis(500),
        },
        retry: RetryConfig {
            max_attempts: 2,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            backoff_multiplier: 2.0,
            jitter: false,
            max_consecutive_poll_failures: None,
        },
        ..Config::default()
    }
}

/// Tracker over a scripted backend; the backend is returned for inspection
pub(crate) fn create_test_tracker(backend: ScriptedBackend) -> (JobTracker, Arc<ScriptedBackend>) {
    create_test_tracker_with(fast_config(), backend)
}

pub(crate) fn create_test_tracker_with(
    config: Config,
    backend: ScriptedBackend,
) -> (JobTracker, Arc<ScriptedBackend>) {
    let backend = Arc::new(backend);
    let tracker = JobTracker::with_backend(config, backend.clone());
    (tracker, backend)
}

pub(crate) fn pdf(name: &str) -> SourceFile {
    SourceFile::new(name, b"%PDF-1.7 test".to_vec())
}

pub(crate) fn params() -> TranslateParams {
    TranslateParams::new()
        .with("service", "OpenAI")
        .with("lang_from", "en")
        .with("lang_to", "zh")
}

pub(crate) const WAIT: Duration = Duration::from_secs(5);
