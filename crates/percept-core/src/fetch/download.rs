//! Streaming file downloads with atomic finalization.
//!
//! Downloads stream into a `.part` sidecar next to the destination and are
//! renamed into place only after the stream completes (and the digest checks
//! out, when one was supplied). Any failure removes the sidecar so the cache
//! never holds a truncated file.

use crate::config::NetworkConfig;
use crate::error::{PerceptError, Result};
use futures::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// HTTP downloader used by the resolver for remote sources.
pub struct Downloader {
    client: Client,
    temp_suffix: String,
}

impl Downloader {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(NetworkConfig::REQUEST_TIMEOUT)
            .user_agent(NetworkConfig::USER_AGENT)
            .build()
            .map_err(|e| PerceptError::Network {
                message: format!("Failed to create HTTP client: {e}"),
                source: Some(e),
            })?;

        Ok(Self {
            client,
            temp_suffix: NetworkConfig::DOWNLOAD_TEMP_SUFFIX.to_string(),
        })
    }

    /// Download `url` to `destination`.
    ///
    /// * `headers` are forwarded verbatim on the request.
    /// * `expected_sha256`, when present, is checked against the streamed
    ///   bytes before the file is moved into place.
    ///
    /// Returns the number of bytes written.
    pub async fn download(
        &self,
        url: &str,
        destination: &Path,
        headers: &[(String, String)],
        expected_sha256: Option<&str>,
    ) -> Result<u64> {
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PerceptError::io_with_path(e, parent))?;
        }

        let temp_path = PathBuf::from(format!("{}{}", destination.display(), self.temp_suffix));

        let result = self
            .stream_to_file(url, &temp_path, headers, expected_sha256)
            .await;

        match result {
            Ok(bytes) => {
                tokio::fs::rename(&temp_path, destination).await.map_err(|e| {
                    let _ = std::fs::remove_file(&temp_path);
                    PerceptError::io_with_path(e, destination)
                })?;

                info!("Downloaded {} bytes to {}", bytes, destination.display());
                Ok(bytes)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&temp_path).await;
                Err(e)
            }
        }
    }

    async fn stream_to_file(
        &self,
        url: &str,
        temp_path: &Path,
        headers: &[(String, String)],
        expected_sha256: Option<&str>,
    ) -> Result<u64> {
        let mut request = self.client.get(url);
        for (key, value) in headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(|e| PerceptError::Network {
            message: format!("GET {url} failed: {e}"),
            source: Some(e),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PerceptError::DownloadFailed {
                url: url.to_string(),
                message: format!("server returned status {status}"),
            });
        }

        let mut file = tokio::fs::File::create(temp_path)
            .await
            .map_err(|e| PerceptError::io_with_path(e, temp_path))?;

        let mut hasher = expected_sha256.map(|_| Sha256::new());
        let mut bytes_downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| PerceptError::Network {
                message: format!("Error reading download stream: {e}"),
                source: Some(e),
            })?;

            file.write_all(&chunk)
                .await
                .map_err(|e| PerceptError::io_with_path(e, temp_path))?;

            if let Some(ref mut hasher) = hasher {
                hasher.update(&chunk);
            }
            bytes_downloaded += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| PerceptError::io_with_path(e, temp_path))?;

        if let (Some(hasher), Some(expected)) = (hasher, expected_sha256) {
            let actual = hex::encode(hasher.finalize());
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(PerceptError::HashMismatch {
                    expected: expected.to_lowercase(),
                    actual,
                });
            }
            debug!("Digest verified for {}", url);
        }

        Ok(bytes_downloaded)
    }
}
