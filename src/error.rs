//! Error types for pdftrans
//!
//! This module provides error handling for the library, including:
//! - The crate-wide [`Error`] enum returned by tracker and backend operations
//! - [`JobErrorDetail`], the structured error record attached to a failed job
//! - Machine-readable error codes for callers that surface errors to users

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{JobId, JobState};

/// Result type alias for pdftrans operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pdftrans
///
/// Job-level failures (a rejected submission, a backend-reported failure) are
/// recorded on the job itself as a [`JobErrorDetail`]; the variants here are what
/// the calling operation returns.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "base_url")
        key: Option<String>,
    },

    /// Upload or translate request failed before a remote id was assigned
    #[error("submission failed: {0}")]
    Submission(String),

    /// Backend reported the job as failed; the message is the backend's text verbatim
    #[error("job {id} failed on the backend: {message}")]
    BackendFailure {
        /// The failed job
        id: JobId,
        /// Backend error detail
        message: String,
    },

    /// Job was cancelled before it produced artifacts
    #[error("job {0} was cancelled")]
    Cancelled(JobId),

    /// Status query failed; the job keeps its state and the query is retried
    #[error("status query failed for {remote_id}: {reason}")]
    PollTransient {
        /// Backend task id that was being queried
        remote_id: String,
        /// What went wrong
        reason: String,
    },

    /// Artifacts were requested for a job that has not reached SUCCESS
    #[error("job {id} is not ready: state is {state}")]
    NotReady {
        /// The job whose artifacts were requested
        id: JobId,
        /// The job's current state
        state: JobState,
    },

    /// A job with this local id is already registered
    #[error("job {0} is already registered")]
    DuplicateJob(JobId),

    /// No job with this local id is registered
    #[error("job {0} not found")]
    NotFound(JobId),

    /// Cannot perform operation in the job's current state
    #[error("cannot {operation} job {id} in state {current_state}")]
    InvalidState {
        /// The job the operation targeted
        id: JobId,
        /// The operation that was attempted (e.g., "cancel")
        operation: String,
        /// The state that prevents the operation
        current_state: JobState,
    },

    /// Provider name not present in the service catalog
    #[error("unknown translation service: {0}")]
    UnknownService(String),

    /// Unsupported interface locale
    #[error("unsupported locale: {0}")]
    UnsupportedLocale(String),

    /// Backend answered with a non-2xx status
    #[error("backend error ({status}): {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Raw response body for debugging
        body: String,
    },

    /// A request did not complete within the configured timeout
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Invalid backend URL
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The tracker is shutting down and not accepting new jobs
    #[error("shutdown in progress: not accepting new jobs")]
    ShuttingDown,
}

impl Error {
    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Submission(_) => "submission_failed",
            Error::BackendFailure { .. } => "backend_failure",
            Error::Cancelled(_) => "cancelled",
            Error::PollTransient { .. } => "poll_transient",
            Error::NotReady { .. } => "not_ready",
            Error::DuplicateJob(_) => "duplicate_job",
            Error::NotFound(_) => "not_found",
            Error::InvalidState { .. } => "invalid_state",
            Error::UnknownService(_) => "unknown_service",
            Error::UnsupportedLocale(_) => "unsupported_locale",
            Error::Api { .. } => "backend_error",
            Error::Timeout(_) => "timeout",
            Error::Network(_) => "network_error",
            Error::Url(_) => "invalid_url",
            Error::Serialization(_) => "serialization_error",
            Error::Io(_) => "io_error",
            Error::ShuttingDown => "shutting_down",
        }
    }
}

/// Error detail recorded on a job that ended in FAILURE
///
/// `message` carries the backend's error text verbatim when the backend itself
/// reported the failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobErrorDetail {
    /// Machine-readable error code (e.g., "submission_failed", "backend_failure")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context (HTTP status, consecutive poll failures, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl JobErrorDetail {
    /// Create a new detail with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Create a detail with additional context
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details),
        }
    }

    /// Detail for a submission the backend rejected or never received
    pub fn submission(err: &Error) -> Self {
        match err {
            Error::Api { status, body } => Self::with_details(
                "submission_failed",
                body.clone(),
                serde_json::json!({ "status": status }),
            ),
            other => Self::new("submission_failed", other.to_string()),
        }
    }

    /// Detail for a failure the backend reported through the status endpoint
    pub fn backend_failure(message: Option<String>) -> Self {
        Self::new(
            "backend_failure",
            message.unwrap_or_else(|| "backend reported failure".to_string()),
        )
    }

    /// Detail for a poller that gave up after repeated status query failures
    pub fn poll_exhausted(failures: u32, last_error: &Error) -> Self {
        Self::with_details(
            "poll_exhausted",
            last_error.to_string(),
            serde_json::json!({ "consecutive_failures": failures }),
        )
    }
}

impl From<&Error> for JobErrorDetail {
    fn from(err: &Error) -> Self {
        Self::new(err.code(), err.to_string())
    }
}
