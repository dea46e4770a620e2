//! reqwest implementation of [`Backend`] for the `/api/*` endpoints.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use url::Url;

use super::traits::{Backend, TranslateSource};
use super::wire::{RawStatus, TaskCreated};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{
    ArtifactKind, BackendCatalog, RemoteId, SourceFile, StatusReport, TranslateParams,
    UploadReceipt,
};

/// HTTP client for a single translation backend
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: reqwest::Client,
    base: Url,
    timeout: Duration,
    transfer_timeout: Option<Duration>,
}

impl HttpBackend {
    /// Create a backend client from configuration
    pub fn new(config: &Config) -> Result<Self> {
        // No client-wide timeout: uploads and downloads get their own limit
        let client = reqwest::Client::builder()
            .connect_timeout(config.poll.request_timeout)
            .build()?;
        Ok(
            Self::with_client(client, &config.base_url, config.poll.request_timeout)?
                .with_transfer_timeout(config.transfer_timeout),
        )
    }

    /// Create a backend client reusing an existing [`reqwest::Client`]
    pub fn with_client(client: reqwest::Client, base_url: &str, timeout: Duration) -> Result<Self> {
        // A trailing slash keeps any path prefix when joining endpoints
        let base = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{}/", base_url))?
        };
        Ok(Self {
            client,
            base,
            timeout,
            transfer_timeout: None,
        })
    }

    /// Limit uploads, translate submissions and downloads; `None` leaves them unbounded
    pub fn with_transfer_timeout(mut self, limit: Option<Duration>) -> Self {
        self.transfer_timeout = limit;
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(&format!("api/{}", path))?)
    }

    fn task_endpoint(&self, prefix: &str, remote_id: &RemoteId, suffix: &str) -> Result<Url> {
        self.endpoint(&format!(
            "{}/{}{}",
            prefix,
            urlencoding::encode(remote_id.as_str()),
            suffix
        ))
    }

    fn file_part(file: &SourceFile) -> Part {
        Part::bytes(file.data.to_vec()).file_name(file.name.clone())
    }

    async fn execute(request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request.send().await?;
        Self::ensure_success(response).await
    }

    /// Run a short control request (status, catalog, cancel) under the request timeout
    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| Error::Timeout(self.timeout))?
    }

    /// Run a file transfer under the transfer timeout, if one is configured
    async fn transfer<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        match self.transfer_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => call.await,
        }
    }

    /// Turn a non-2xx response into [`Error::Api`] carrying the body text
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn upload(&self, file: &SourceFile) -> Result<UploadReceipt> {
        let form = Form::new().part("file", Self::file_part(file));
        let request = self.client.post(self.endpoint("upload")?).multipart(form);
        let receipt: UploadReceipt = self
            .transfer(async move { Self::parse_json(Self::execute(request).await?).await })
            .await?;
        tracing::debug!(file_id = %receipt.file_id, name = %file.name, "file uploaded");
        Ok(receipt)
    }

    async fn translate(
        &self,
        source: TranslateSource<'_>,
        params: &TranslateParams,
    ) -> Result<RemoteId> {
        let mut form = Form::new();
        for (key, value) in params.iter() {
            form = form.text(key.clone(), value.clone());
        }
        form = match source {
            TranslateSource::Inline(file) => form.part("file", Self::file_part(file)),
            TranslateSource::Uploaded(receipt) => form.text("file_id", receipt.file_id.clone()),
        };

        let request = self.client.post(self.endpoint("translate")?).multipart(form);
        let created: TaskCreated = self
            .transfer(async move { Self::parse_json(Self::execute(request).await?).await })
            .await?;
        Ok(created.into())
    }

    async fn status(&self, remote_id: &RemoteId) -> Result<StatusReport> {
        let request = self
            .client
            .get(self.task_endpoint("status", remote_id, "")?);
        let raw: RawStatus = self
            .bounded(async move { Self::parse_json(Self::execute(request).await?).await })
            .await?;
        raw.into_report().ok_or_else(|| Error::PollTransient {
            remote_id: remote_id.to_string(),
            reason: "status response carries no recognizable state".to_string(),
        })
    }

    async fn catalog(&self) -> Result<BackendCatalog> {
        let request = self.client.get(self.endpoint("config")?);
        self.bounded(async move { Self::parse_json(Self::execute(request).await?).await })
            .await
    }

    async fn cancel(&self, remote_id: &RemoteId) -> Result<()> {
        let request = self
            .client
            .post(self.task_endpoint("cancel", remote_id, "")?);
        self.bounded(Self::execute(request)).await?;
        Ok(())
    }

    async fn download(&self, remote_id: &RemoteId, kind: ArtifactKind) -> Result<Vec<u8>> {
        let request = self.client.get(self.task_endpoint(
            "download_task",
            remote_id,
            kind.path_suffix(),
        )?);
        self.transfer(async move {
            let response = Self::execute(request).await?;
            Ok::<_, Error>(response.bytes().await?.to_vec())
        })
        .await
    }

    fn artifact_url(&self, remote_id: &RemoteId, kind: ArtifactKind) -> String {
        match self.task_endpoint("download_task", remote_id, kind.path_suffix()) {
            Ok(url) => url.to_string(),
            // Base was validated at construction; joining a relative path cannot fail
            Err(_) => format!(
                "{}api/download_task/{}{}",
                self.base,
                remote_id,
                kind.path_suffix()
            ),
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
