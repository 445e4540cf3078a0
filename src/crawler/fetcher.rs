//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for a run, including:
//! - Building the HTTP client with user agent and timeouts
//! - Pacing every request through a single [`Pacer`]
//! - GET requests for target pages
//! - Streaming file downloads to a temporary file and renaming them into place
//! - Error classification

use crate::config::Config;
use crate::crawler::pacer::Pacer;
use crate::FetchError;
use reqwest::{Client, Response};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use url::Url;

/// Result of a completed download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    /// Where the file now lives under its final name
    pub final_path: PathBuf,

    /// Bytes of body written
    pub bytes_written: u64,

    /// HTTP status code of the response
    pub status_code: u16,
}

/// A fetched HTML page
#[derive(Debug, Clone)]
pub struct PageResponse {
    /// URL after redirects, used to resolve relative links
    pub final_url: Url,

    /// Page body
    pub body: String,
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use harvester::config::parse_config;
/// use harvester::crawler::build_http_client;
///
/// let config = parse_config(r#"{"target_urls": ["https://example.com/"], "allowed_extensions": [".pdf"]}"#).unwrap();
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.request_timeout())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Paced HTTP fetcher
///
/// The fetcher, not its callers, owns request pacing: every request it sends waits on
/// the same [`Pacer`], whether it is a page scan or a file download.
pub struct Fetcher {
    client: Client,
    pacer: Pacer,
    requests_sent: u64,
}

impl Fetcher {
    /// Creates a fetcher from the run configuration
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(
            build_http_client(config)?,
            config.request_delay(),
        ))
    }

    /// Creates a fetcher around an existing client
    pub fn with_client(client: Client, delay: Duration) -> Self {
        Self {
            client,
            pacer: Pacer::new(delay),
            requests_sent: 0,
        }
    }

    /// Number of requests sent so far
    pub fn requests_sent(&self) -> u64 {
        self.requests_sent
    }

    /// Fetches a page and returns its body
    pub async fn fetch_page(&mut self, url: &str) -> Result<PageResponse, FetchError> {
        let response = self.get(url).await?;
        let final_url = response.url().clone();

        let body = response.text().await.map_err(|e| FetchError::Network {
            url: url.to_string(),
            source: e,
        })?;

        Ok(PageResponse { final_url, body })
    }

    /// Downloads `url` to `destination`
    ///
    /// The body is streamed into a hidden temporary file next to `destination` and only
    /// renamed to the final name once it has been fully received and synced. On any
    /// failure the temporary file is removed, so nothing is ever visible under the final
    /// name unless it is complete. Temporary files for the same destination left behind
    /// by a killed run are removed first. An existing file at `destination` is replaced.
    ///
    /// # Errors
    ///
    /// * `FetchError::Network` - connection failure, timeout or broken body stream
    /// * `FetchError::HttpStatus` - the server answered with a non-2xx status
    /// * `FetchError::Io` - the file could not be written or renamed
    /// * `FetchError::InvalidUrl` - the URL could not be turned into a request
    pub async fn fetch(
        &mut self,
        url: &str,
        destination: &Path,
    ) -> Result<FetchOutcome, FetchError> {
        let response = self.get(url).await?;
        let status_code = response.status().as_u16();

        remove_stale_parts(destination).await;
        let tmp_path = temp_path_for(destination);
        let mut file = tokio::fs::File::create(&tmp_path)
            .await
            .map_err(|e| FetchError::io(&tmp_path, e))?;

        let streamed = stream_to_file(&mut file, response, url, &tmp_path).await;
        drop(file);

        let bytes_written = match streamed {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!("Removing partial file {}", tmp_path.display());
                let _ = tokio::fs::remove_file(&tmp_path).await;
                return Err(e);
            }
        };

        if let Err(e) = tokio::fs::rename(&tmp_path, destination).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(FetchError::io(destination, e));
        }

        Ok(FetchOutcome {
            final_path: destination.to_path_buf(),
            bytes_written,
            status_code,
        })
    }

    /// Sends a paced GET request and checks its status
    async fn get(&mut self, url: &str) -> Result<Response, FetchError> {
        self.pacer.wait().await;
        self.requests_sent += 1;

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_builder() {
                FetchError::InvalidUrl(format!("{}: {}", url, e))
            } else {
                FetchError::Network {
                    url: url.to_string(),
                    source: e,
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

/// Hidden sibling of `destination` used while the body is in flight
fn temp_path_for(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());
    let tmp_name = format!(".{}.{}.part", name, std::process::id());
    match destination.parent() {
        Some(parent) => parent.join(tmp_name),
        None => PathBuf::from(tmp_name),
    }
}

/// Removes `.{name}.{pid}.part` siblings of `destination` from interrupted runs
async fn remove_stale_parts(destination: &Path) {
    let (Some(dir), Some(name)) = (destination.parent(), destination.file_name()) else {
        return;
    };
    let prefix = format!(".{}.", name.to_string_lossy());

    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let entry_name = entry.file_name();
        let stale = entry_name
            .to_string_lossy()
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(".part"))
            .is_some_and(|pid| !pid.is_empty() && pid.chars().all(|c| c.is_ascii_digit()));

        if stale {
            tracing::debug!("Removing stale partial file {}", entry.path().display());
            let _ = tokio::fs::remove_file(entry.path()).await;
        }
    }
}

/// Streams response body to file, returning bytes written
async fn stream_to_file(
    file: &mut tokio::fs::File,
    mut response: Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, FetchError> {
    let mut bytes_written: u64 = 0;

    while let Some(chunk) = response.chunk().await.map_err(|e| FetchError::Network {
        url: url.to_string(),
        source: e,
    })? {
        file.write_all(&chunk)
            .await
            .map_err(|e| FetchError::io(file_path, e))?;
        bytes_written += chunk.len() as u64;
    }

    file.flush().await.map_err(|e| FetchError::io(file_path, e))?;
    file.sync_all()
        .await
        .map_err(|e| FetchError::io(file_path, e))?;

    Ok(bytes_written)
}
