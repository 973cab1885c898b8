//! HTTP utilities
//!
//! Centralized HTTP client with integrated streaming download functionality.
//! It handles:
//! - Client configuration (user agent, timeouts, extra trusted CAs)
//! - Small in-memory fetches for catalogs and icons
//! - Streaming archive downloads with throttled progress tracking
//! - `.part` files that are renamed into place only after a complete download

use futures::StreamExt;
use reqwest::{Client, Response};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info_span, warn, Instrument};
use url::Url;

use super::progress::{ProgressCallback, ProgressTracker};
use crate::config::InstallerConfig;
use crate::error::{FileOperation, InstallError, Result};

/// Size of the blocks written to disk (and counted for progress)
pub const BLOCK_SIZE: usize = 8 * 1024;

/// HTTP client shared by the catalog loader, loader installer and pack installer
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    archive_timeout: Duration,
    progress_interval: Duration,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("archive_timeout", &self.archive_timeout)
            .field("progress_interval", &self.progress_interval)
            .finish()
    }
}

impl HttpClient {
    /// Create a new HTTP client from installer configuration
    pub fn from_config(config: &InstallerConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.connect_timeout);

        if let Some(bundle) = &config.ca_bundle {
            for certificate in load_ca_bundle(bundle)? {
                builder = builder.add_root_certificate(certificate);
            }
        }

        let client = builder.build().map_err(|e| InstallError::Configuration {
            message: format!("Failed to create HTTP client: {}", e),
            field: None,
        })?;

        Ok(Self {
            client,
            archive_timeout: config.archive_timeout,
            progress_interval: config.progress_interval,
        })
    }

    /// GET `url` and fail on any non-success status
    ///
    /// With `Some(timeout)` the deadline covers the whole request, body included.
    async fn get(&self, url: &str, timeout: Option<Duration>) -> Result<Response> {
        let parsed = parse_url(url)?;
        let mut request = self.client.get(parsed);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let timeout_secs = timeout.unwrap_or(self.archive_timeout).as_secs();
        let response = request
            .send()
            .await
            .map_err(|e| InstallError::from_reqwest(url, e, timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InstallError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    /// Fetch a whole (small) body into memory
    pub async fn get_bytes(&self, url: &str, timeout: Duration) -> Result<Vec<u8>> {
        debug!("Fetching {}", url);
        let response = self.get(url, Some(timeout)).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| InstallError::from_reqwest(url, e, timeout.as_secs()))?;
        Ok(body.to_vec())
    }

    /// Download from URL to file with streaming progress support
    ///
    /// The body goes to `<dest>.part` first and is renamed to `dest` once complete;
    /// the partial file is removed on any failure. Returns the number of bytes written.
    pub async fn download_to_file(
        &self,
        url: &str,
        dest_path: &Path,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<u64> {
        let temp_path = partial_path(dest_path);
        let result = self
            .stream_to_file(url, dest_path, &temp_path, progress_callback)
            .instrument(info_span!("download", url = %url))
            .await;

        if result.is_err() && temp_path.exists() {
            if let Err(e) = fs::remove_file(&temp_path).await {
                warn!("Could not remove partial download {}: {}", temp_path.display(), e);
            }
        }
        result
    }

    async fn stream_to_file(
        &self,
        url: &str,
        dest_path: &Path,
        temp_path: &Path,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<u64> {
        debug!("Stream downloading: {} to {}", url, dest_path.display());

        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(InstallError::fs_with(parent, FileOperation::CreateDir))?;
        }

        // Archive downloads have no overall deadline, only an idle one
        let idle = self.archive_timeout;
        let timeout_secs = idle.as_secs();
        let stalled = || InstallError::NetworkTimeout {
            url: url.to_string(),
            duration_secs: timeout_secs,
        };
        let response = tokio::time::timeout(idle, self.get(url, None))
            .await
            .map_err(|_| stalled())??;
        let content_length = response.content_length();
        debug!("Content length: {:?}", content_length);

        let mut file = fs::File::create(temp_path)
            .await
            .map_err(InstallError::fs_with(temp_path, FileOperation::Create))?;

        let mut tracker = ProgressTracker::new(content_length, self.progress_interval);
        let mut stream = response.bytes_stream();

        while let Some(chunk_result) = tokio::time::timeout(idle, stream.next())
            .await
            .map_err(|_| stalled())?
        {
            let chunk = chunk_result.map_err(|e| InstallError::from_reqwest(url, e, timeout_secs))?;

            for block in chunk.chunks(BLOCK_SIZE) {
                file.write_all(block)
                    .await
                    .map_err(InstallError::fs_with(temp_path, FileOperation::Write))?;

                if let Some(progress) = tracker.advance(block.len() as u64, Instant::now()) {
                    if let Some(ref callback) = progress_callback {
                        callback(progress);
                    }
                }
            }
        }

        file.flush()
            .await
            .map_err(InstallError::fs_with(temp_path, FileOperation::Write))?;
        file.sync_all()
            .await
            .map_err(InstallError::fs_with(temp_path, FileOperation::Write))?;
        drop(file);

        fs::rename(temp_path, dest_path)
            .await
            .map_err(InstallError::fs_with(dest_path, FileOperation::Rename))?;

        if let (Some(progress), Some(callback)) = (tracker.finish(), progress_callback.as_ref()) {
            callback(progress);
        }

        debug!("Stream download completed: {} bytes", tracker.downloaded());
        Ok(tracker.downloaded())
    }
}

/// Parse an absolute URL, keeping the offending text in the error
pub fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| match InstallError::from(e) {
        InstallError::InvalidUrl { suggestion, source, .. } => InstallError::InvalidUrl {
            url: url.to_string(),
            suggestion,
            source,
        },
        other => other,
    })
}

/// Path used while a download is still in flight
pub fn partial_path(dest_path: &Path) -> PathBuf {
    let mut name = OsString::from(dest_path.as_os_str());
    name.push(".part");
    PathBuf::from(name)
}

fn load_ca_bundle(path: &Path) -> Result<Vec<reqwest::Certificate>> {
    if !path.is_file() {
        warn!("CA bundle {} not found, using the platform store only", path.display());
        return Ok(Vec::new());
    }

    let pem = std::fs::read(path).map_err(InstallError::fs_with(path, FileOperation::Read))?;
    let certificates =
        reqwest::Certificate::from_pem_bundle(&pem).map_err(|e| InstallError::Configuration {
            message: format!("CA bundle {} is not valid PEM: {}", path.display(), e),
            field: Some("ca_bundle".to_string()),
        })?;
    debug!("Loaded {} trusted certificates from {}", certificates.len(), path.display());
    Ok(certificates)
}
