//! Remote conversion client: one multipart request per conversion.
//!
//! The service does the actual format conversion. This module only
//! packages the file and mode, issues the request, and turns the answer
//! into either a [`ResultReference`] or a [`ConvertError`]:
//!
//! ```text
//! POST {base}/api/v1/convert        file=<bytes>  conversion_type=<mode>
//!   2xx → { "download_url": "/api/v1/convert/download/<name>", … }
//!   4xx/5xx → { "detail": "<reason>" }
//! ```
//!
//! The returned reference is a *path*; [`ConversionService::resolve_location`]
//! concatenates it with the same base address to get a downloadable URL.
//! There is no retry: a failed request is reported and the user decides.

use crate::config::ClientConfig;
use crate::error::ConvertError;
use crate::intake::CandidateFile;
use crate::mode::{content_type_for, ConversionMode};
use futures::future::BoxFuture;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Path of the conversion endpoint, relative to the base address.
pub const CONVERT_PATH: &str = "/api/v1/convert";

/// Path of the health endpoint, relative to the base address.
pub const HEALTH_PATH: &str = "/api/v1/health";

/// What the service returns for a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultReference {
    /// Server-relative path of the converted document.
    pub download_url: String,
    #[serde(default)]
    pub output_filename: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ResultReference {
    /// A bare reference carrying only the download path.
    pub fn new(download_url: impl Into<String>) -> Self {
        Self {
            download_url: download_url.into(),
            output_filename: None,
            file_size: None,
            message: None,
        }
    }
}

/// Service health as reported by `GET /api/v1/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub upload_dir_exists: Option<bool>,
    #[serde(default)]
    pub output_dir_exists: Option<bool>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

/// The seam between the workflow and whatever performs the conversion.
///
/// [`RemoteClient`] is the production implementation; tests substitute
/// fakes that settle on command.
pub trait ConversionService: Send + Sync {
    /// Submit one file for conversion. Called exactly once per convert.
    fn submit<'a>(
        &'a self,
        file: &'a CandidateFile,
        mode: ConversionMode,
    ) -> BoxFuture<'a, Result<ResultReference, ConvertError>>;

    /// Turn a returned reference into an absolute, downloadable location.
    fn resolve_location(&self, reference: &ResultReference) -> String;
}

/// HTTP client for the conversion service.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl RemoteClient {
    pub fn new(config: ClientConfig) -> Result<Self, ConvertError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ConvertError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Absolute URL for a server-relative path.
    pub fn url(&self, path: &str) -> String {
        join_url(&self.config.base_url, path)
    }

    /// Upload `file` for conversion under `mode`.
    pub async fn submit(
        &self,
        file: &CandidateFile,
        mode: ConversionMode,
    ) -> Result<ResultReference, ConvertError> {
        let url = self.url(CONVERT_PATH);
        info!(
            "Submitting {} ({} bytes) for {} to {}",
            file.name(),
            file.size_bytes(),
            mode,
            url
        );

        let part = Part::stream_with_length(file.shared_content(), file.size_bytes())
            .file_name(file.name().to_string())
            .mime_str(content_type_for(file.name()))
            .map_err(|e| ConvertError::Internal(format!("Invalid content type: {e}")))?;
        let form = Form::new()
            .part("file", part)
            .text("conversion_type", mode.as_str());

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(&url, e))?;
        debug!("Conversion response: HTTP {} ({} bytes)", status, body.len());

        if !status.is_success() {
            let detail = parse_error_detail(&body);
            warn!(
                "Conversion of {} failed: HTTP {} {:?}",
                file.name(),
                status,
                detail
            );
            return Err(ConvertError::Service {
                status: status.as_u16(),
                detail,
            });
        }

        parse_success(&url, &body)
    }

    /// Query the service's health endpoint.
    pub async fn health(&self) -> Result<HealthStatus, ConvertError> {
        let url = self.url(HEALTH_PATH);
        debug!("Checking service health at {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(&url, e))?;

        if !status.is_success() {
            return Err(ConvertError::Service {
                status: status.as_u16(),
                detail: parse_error_detail(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| ConvertError::MalformedResponse {
            url,
            reason: e.to_string(),
        })
    }

    /// Download a converted document to `dest`.
    ///
    /// The body is streamed into a temporary file next to `dest` and renamed
    /// into place only once complete, so an interrupted download never leaves
    /// a truncated file behind. Returns the number of bytes written.
    pub async fn download_to_file(
        &self,
        location: &str,
        dest: impl AsRef<Path>,
    ) -> Result<u64, ConvertError> {
        let dest = dest.as_ref();
        info!("Downloading {} to {}", location, dest.display());

        let download_failed = |reason: String| ConvertError::DownloadFailed {
            url: location.to_string(),
            reason,
        };
        let write_failed = |source: std::io::Error| ConvertError::OutputWriteFailed {
            path: dest.to_path_buf(),
            source,
        };

        let response = self
            .http
            .get(location)
            .send()
            .await
            .map_err(|e| download_failed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(download_failed(format!("HTTP {}", response.status())));
        }

        let dir = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&dir).await.map_err(write_failed)?;

        let tmp = tokio::task::spawn_blocking(move || tempfile::NamedTempFile::new_in(dir))
            .await
            .map_err(|e| ConvertError::Internal(format!("temp file task failed: {e}")))?
            .map_err(write_failed)?;
        let mut out = tokio::fs::File::from_std(tmp.reopen().map_err(write_failed)?);

        let mut written = 0u64;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| download_failed(e.to_string()))?;
            out.write_all(&chunk).await.map_err(write_failed)?;
            written += chunk.len() as u64;
        }
        out.flush().await.map_err(write_failed)?;
        out.sync_all().await.map_err(write_failed)?;
        drop(out);

        let target = dest.to_path_buf();
        tokio::task::spawn_blocking(move || tmp.persist(target))
            .await
            .map_err(|e| ConvertError::Internal(format!("persist task failed: {e}")))?
            .map_err(|e| write_failed(e.error))?;

        debug!("Wrote {} bytes to {}", written, dest.display());
        Ok(written)
    }
}

impl ConversionService for RemoteClient {
    fn submit<'a>(
        &'a self,
        file: &'a CandidateFile,
        mode: ConversionMode,
    ) -> BoxFuture<'a, Result<ResultReference, ConvertError>> {
        Box::pin(RemoteClient::submit(self, file, mode))
    }

    fn resolve_location(&self, reference: &ResultReference) -> String {
        self.url(&reference.download_url)
    }
}

/// Concatenate a normalised base address and a server-relative path.
pub fn join_url(base: &str, path: &str) -> String {
    if path.is_empty() || path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

/// Pull the service's `detail` message out of an error body.
///
/// Only a non-empty string counts; validation errors that carry a list of
/// field problems fall back to the generic message.
pub fn parse_error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("detail")?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Decode a success body into a [`ResultReference`].
pub fn parse_success(url: &str, body: &str) -> Result<ResultReference, ConvertError> {
    let reference: ResultReference =
        serde_json::from_str(body).map_err(|e| ConvertError::MalformedResponse {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    if reference.download_url.trim().is_empty() {
        return Err(ConvertError::MalformedResponse {
            url: url.to_string(),
            reason: "empty download_url".into(),
        });
    }
    Ok(reference)
}

fn transport_error(url: &str, e: reqwest::Error) -> ConvertError {
    let reason = if e.is_timeout() {
        format!("timed out ({e})")
    } else {
        e.to_string()
    };
    ConvertError::Transport {
        url: url.to_string(),
        reason,
    }
}
