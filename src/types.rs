//! Core types for pdftrans

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, JobErrorDetail, Result};

/// Client-generated identifier for a job, unique for the lifetime of a tracker
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl JobId {
    /// Create a new JobId
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for JobId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Backend-assigned task identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(pub String);

impl RemoteId {
    /// Create a new RemoteId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RemoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Job lifecycle state
///
/// `Pending` is initial. `Success`, `Failure` and `Revoked` are terminal and
/// have no outgoing transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    /// Submitted, not yet started by the backend
    Pending,
    /// Backend reports incremental progress
    Progress,
    /// Finished, artifacts available
    Success,
    /// Finished with an error
    Failure,
    /// Cancelled
    Revoked,
}

impl JobState {
    /// Whether the state has no outgoing transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Success | JobState::Failure | JobState::Revoked)
    }

    /// Whether moving from `self` to `next` is allowed
    ///
    /// Same-state moves are allowed for the two active states so that progress
    /// refreshes stay idempotent. PROGRESS never goes back to PENDING.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        match self {
            JobState::Pending => true,
            JobState::Progress => next != JobState::Pending,
            JobState::Success | JobState::Failure | JobState::Revoked => false,
        }
    }

    /// Wire name of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "PENDING",
            JobState::Progress => "PROGRESS",
            JobState::Success => "SUCCESS",
            JobState::Failure => "FAILURE",
            JobState::Revoked => "REVOKED",
        }
    }

    /// Parse a backend state string
    ///
    /// Accepts both the upper-case state names and the lower-case status words
    /// (`pending`, `processing`, `completed`, `failed`, `cancelled`).
    pub fn from_wire(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pending" | "queued" => Some(JobState::Pending),
            "progress" | "processing" | "running" => Some(JobState::Progress),
            "success" | "completed" | "complete" => Some(JobState::Success),
            "failure" | "failed" | "error" => Some(JobState::Failure),
            "revoked" | "cancelled" | "canceled" => Some(JobState::Revoked),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress pair reported while a job is in PROGRESS
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Units completed
    pub current: u64,
    /// Units in total
    pub total: u64,
}

impl Progress {
    /// Create a progress pair
    pub fn new(current: u64, total: u64) -> Self {
        Self { current, total }
    }

    /// Completion percentage (0.0 to 100.0); zero when the total is unknown
    pub fn percent(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        (self.current.min(self.total) as f64 / self.total as f64 * 100.0) as f32
    }
}

/// Input document supplied when a job is created
///
/// The payload is reference-counted so job snapshots stay cheap to clone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    /// File name sent to the backend
    pub name: String,
    /// File contents
    pub data: Arc<[u8]>,
}

impl SourceFile {
    /// Create a source file from a name and bytes
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: Arc::from(data.into()),
        }
    }

    /// Read a file from disk
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read '{}': {}", path.display(), e),
            ))
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());
        Ok(Self::new(name, data))
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Opaque key/value form fields passed through to the translate endpoint
///
/// Service selection, language pair and provider credentials all travel here
/// unexamined by the tracker.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranslateParams(pub BTreeMap<String, String>);

impl TranslateParams {
    /// Empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert a field, replacing any previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Look up a field
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Iterate fields in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

/// Which result document an artifact handle points at
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// The backend's preferred result (mono, falling back to dual)
    Combined,
    /// Translated document only
    Mono,
    /// Source and translation side by side
    Dual,
}

impl ArtifactKind {
    /// Path suffix under `/api/download_task/{id}`
    pub fn path_suffix(&self) -> &'static str {
        match self {
            ArtifactKind::Combined => "",
            ArtifactKind::Mono => "/mono",
            ArtifactKind::Dual => "/dual",
        }
    }
}

/// Lazy reference to a result document; resolving one never downloads it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactHandle {
    /// Job the artifact belongs to
    pub job_id: JobId,
    /// Backend task id
    pub remote_id: RemoteId,
    /// Artifact variant
    pub kind: ArtifactKind,
    /// Absolute download URL
    pub url: String,
}

/// The three handles exposed for a successful job
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSet {
    /// Combined result
    pub combined: ArtifactHandle,
    /// Mono (translation only) result
    pub mono: ArtifactHandle,
    /// Dual (bilingual) result
    pub dual: ArtifactHandle,
}

/// Preview references populated opportunistically during a job's life
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewHandles {
    /// Name of the local source document
    pub source: Option<String>,
    /// Output preview, set once artifacts have been resolved
    pub output: Option<ArtifactHandle>,
}

/// Point-in-time snapshot of a job
#[derive(Clone, Debug, Serialize)]
pub struct Job {
    /// Client-side identity
    pub local_id: JobId,
    /// Backend task id, present once submission succeeded
    pub remote_id: Option<RemoteId>,
    /// Input document
    #[serde(skip)]
    pub source: SourceFile,
    /// Lifecycle state
    pub state: JobState,
    /// Progress pair, only while in PROGRESS
    pub progress: Option<Progress>,
    /// Preview references
    pub previews: PreviewHandles,
    /// Error detail for FAILURE
    pub error: Option<JobErrorDetail>,
    /// Whether a poll task currently owns this job
    pub polling: bool,
    /// When the job was created
    pub created_at: DateTime<Utc>,
    /// When the job last changed
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// New PENDING job for a source file
    pub fn new(local_id: JobId, source: SourceFile) -> Self {
        let now = Utc::now();
        Self {
            local_id,
            remote_id: None,
            previews: PreviewHandles {
                source: Some(source.name.clone()),
                output: None,
            },
            source,
            state: JobState::Pending,
            progress: None,
            error: None,
            polling: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Source file name
    pub fn name(&self) -> &str {
        &self.source.name
    }
}

/// Status report returned by the backend's status endpoint
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusReport {
    /// Reported state
    pub state: JobState,
    /// Progress pair when the state is PROGRESS
    pub progress: Option<Progress>,
    /// Backend error text, verbatim
    pub error: Option<String>,
}

impl StatusReport {
    /// Report with only a state
    pub fn new(state: JobState) -> Self {
        Self {
            state,
            progress: None,
            error: None,
        }
    }

    /// PROGRESS report with a progress pair
    pub fn progress(current: u64, total: u64) -> Self {
        Self {
            state: JobState::Progress,
            progress: Some(Progress::new(current, total)),
            error: None,
        }
    }

    /// FAILURE report with the backend's error text
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            state: JobState::Failure,
            progress: None,
            error: Some(error.into()),
        }
    }
}

/// Receipt returned by the standalone upload endpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    /// Backend file identifier
    pub file_id: String,
    /// Original file name
    #[serde(default)]
    pub filename: Option<String>,
    /// Server-side storage path
    #[serde(default)]
    pub path: Option<String>,
}

/// Language and service catalog returned by `/api/config`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendCatalog {
    /// Display name to language code
    #[serde(default)]
    pub languages: BTreeMap<String, String>,
    /// Translation engine names the backend accepts
    #[serde(default)]
    pub services: Vec<String>,
    /// Anything else the backend sends
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Event emitted during a job's lifecycle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job registered and submission started
    Submitted {
        /// Job ID
        id: JobId,
        /// Source file name
        name: String,
    },

    /// Backend accepted the job and polling began
    Started {
        /// Job ID
        id: JobId,
        /// Backend task id
        remote_id: RemoteId,
    },

    /// Progress refresh while in PROGRESS
    Progress {
        /// Job ID
        id: JobId,
        /// Units completed
        current: u64,
        /// Units in total
        total: u64,
    },

    /// State changed
    StateChanged {
        /// Job ID
        id: JobId,
        /// Previous state
        from: JobState,
        /// New state
        to: JobState,
    },

    /// Job ended in FAILURE
    Failed {
        /// Job ID
        id: JobId,
        /// Error detail recorded on the job
        error: JobErrorDetail,
    },

    /// Job was cancelled by the client
    Cancelled {
        /// Job ID
        id: JobId,
    },

    /// Job removed from the tracker
    Removed {
        /// Job ID
        id: JobId,
    },
}

impl Event {
    /// Job the event refers to
    pub fn job_id(&self) -> JobId {
        match self {
            Event::Submitted { id, .. }
            | Event::Started { id, .. }
            | Event::Progress { id, .. }
            | Event::StateChanged { id, .. }
            | Event::Failed { id, .. }
            | Event::Cancelled { id }
            | Event::Removed { id } => *id,
        }
    }
}
