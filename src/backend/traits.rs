//! Trait for the remote translation job service

use async_trait::async_trait;

use crate::types::{
    ArtifactKind, BackendCatalog, RemoteId, SourceFile, StatusReport, TranslateParams,
    UploadReceipt,
};

/// What the translate request carries as its document
#[derive(Debug, Clone, Copy)]
pub enum TranslateSource<'a> {
    /// File bytes sent inside the translate form
    Inline(&'a SourceFile),
    /// A file previously stored through the upload endpoint
    Uploaded(&'a UploadReceipt),
}

/// Remote job service the tracker talks to
///
/// [`HttpBackend`](super::HttpBackend) is the production implementation. The
/// trait exists so the tracker's lifecycle can be driven by scripted backends
/// in tests and by alternative transports.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Store a file on the backend without starting a job
    async fn upload(&self, file: &SourceFile) -> crate::Result<UploadReceipt>;

    /// Start a translation task
    ///
    /// `params` are passed through unexamined. Returns the backend task id.
    async fn translate(
        &self,
        source: TranslateSource<'_>,
        params: &TranslateParams,
    ) -> crate::Result<RemoteId>;

    /// Query a task's current state
    async fn status(&self, remote_id: &RemoteId) -> crate::Result<StatusReport>;

    /// Fetch the language/service catalog
    async fn catalog(&self) -> crate::Result<BackendCatalog>;

    /// Ask the backend to cancel a task (best effort)
    async fn cancel(&self, remote_id: &RemoteId) -> crate::Result<()>;

    /// Download one result document
    async fn download(&self, remote_id: &RemoteId, kind: ArtifactKind) -> crate::Result<Vec<u8>>;

    /// Absolute URL of a result document; never performs I/O
    fn artifact_url(&self, remote_id: &RemoteId, kind: ArtifactKind) -> String;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
