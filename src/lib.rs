//! # pdftrans
//!
//! Client-side job tracker for a document translation backend.
//!
//! Submit PDFs for asynchronous translation, follow every job through
//! `PENDING → PROGRESS → SUCCESS | FAILURE | REVOKED`, and fetch the
//! translated documents once they are ready.
//!
//! ## Design Philosophy
//!
//! pdftrans is designed to be:
//! - **One task per job** - Submission and status polling for a job run on its own tokio task
//! - **Sticky terminal states** - Once a job has finished or been cancelled, no late answer changes it
//! - **Event-driven** - Consumers subscribe to lifecycle events instead of re-reading jobs
//! - **Backend-agnostic** - The HTTP client sits behind the [`Backend`] trait
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdftrans::{Config, JobTracker, Service, ServiceSelection, SourceFile};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tracker = JobTracker::new(Config::with_base_url("http://127.0.0.1:8000"))?;
//!
//!     // Subscribe to events
//!     let mut events = tracker.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let params = ServiceSelection::new(Service::DeepSeek, "en", "zh")
//!         .with_setting("deepseek_api_key", "sk-...")
//!         .to_params()?;
//!     let job = tracker
//!         .submit(SourceFile::from_path("paper.pdf").await?, params)
//!         .await?;
//!
//!     let artifacts = tracker
//!         .wait_for_artifacts(job.local_id, Duration::from_secs(600))
//!         .await?;
//!     let dual = tracker.download_artifact(&artifacts.dual).await?;
//!     std::fs::write("paper.dual.pdf", dual)?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Remote job service abstraction and HTTP client
pub mod backend;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Interface locale selection
pub mod locale;
/// Retry logic with exponential backoff
pub mod retry;
/// Translation service catalog
pub mod services;
/// Job tracker (decomposed into focused submodules)
pub mod tracker;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use backend::{Backend, HttpBackend, TranslateSource};
pub use config::{Config, PollConfig, RetryConfig, SubmitMode};
pub use error::{Error, JobErrorDetail, Result};
pub use locale::{Locale, LocaleSettings};
pub use services::{FieldKind, FieldSpec, Service, ServiceSelection};
pub use tracker::{JobRegistry, JobTracker};
pub use types::{
    ArtifactHandle, ArtifactKind, ArtifactSet, BackendCatalog, Event, Job, JobId, JobState,
    PreviewHandles, Progress, RemoteId, SourceFile, StatusReport, TranslateParams, UploadReceipt,
};

/// Helper function to run the tracker with graceful signal handling.
///
/// Waits for a termination signal and then calls the tracker's `shutdown()` method,
/// which cancels every job still in flight.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use pdftrans::{Config, JobTracker, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let tracker = JobTracker::new(Config::default())?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(tracker).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(tracker: JobTracker) -> Result<()> {
    wait_for_signal().await;
    tracker.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C signal"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C signal"),
    }
}
