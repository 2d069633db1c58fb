//! Remote inputs: clips downloaded over HTTP(S) into the workspace.

use async_trait::async_trait;
use reqwest::{redirect, Client, Url};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use super::traits::InputSource;
use crate::config::FetchConfig;
use crate::error::MergeError;
use crate::metrics::{FETCH_BYTES_TOTAL, FETCH_REQUESTS_TOTAL};

/// Scheme and host allowlist applied to request URLs and redirect targets.
#[derive(Debug, Clone)]
struct UrlPolicy {
    schemes: Vec<String>,
    hosts: Vec<String>,
}

impl UrlPolicy {
    fn from_config(config: &FetchConfig) -> Self {
        Self {
            schemes: config
                .allowed_schemes
                .iter()
                .map(|s| s.to_ascii_lowercase())
                .collect(),
            hosts: config
                .allowed_hosts
                .iter()
                .map(|h| h.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    fn check(&self, url: &Url) -> Result<(), String> {
        if !self.schemes.iter().any(|s| s == url.scheme()) {
            return Err(format!("scheme '{}' is not allowed", url.scheme()));
        }

        let host = url
            .host_str()
            .ok_or_else(|| "URL has no host".to_string())?
            .to_ascii_lowercase();

        if self.hosts.is_empty() {
            return Ok(());
        }

        // Exact match or a subdomain of an allowed host.
        let allowed = self
            .hosts
            .iter()
            .any(|h| host == *h || host.ends_with(&format!(".{}", h)));
        if allowed {
            Ok(())
        } else {
            Err(format!("host '{}' is not allowed", host))
        }
    }
}

/// HTTP client for downloading remote inputs with size, time and
/// destination limits.
#[derive(Debug, Clone)]
pub struct RemoteFetcher {
    client: Client,
    policy: UrlPolicy,
    max_bytes: u64,
}

impl RemoteFetcher {
    /// Creates a fetcher with the given limits.
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let policy = UrlPolicy::from_config(config);
        let max_redirects = config.max_redirects;
        let redirect_policy = policy.clone();

        let client = Client::builder()
            .redirect(redirect::Policy::custom(move |attempt| {
                if attempt.previous().len() > max_redirects {
                    attempt.error("too many redirects")
                } else if let Err(reason) = redirect_policy.check(attempt.url()) {
                    attempt.error(format!("redirect rejected: {}", reason))
                } else {
                    attempt.follow()
                }
            }))
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            policy,
            max_bytes: config.max_bytes,
        })
    }

    /// Creates a fetcher with default limits.
    pub fn with_defaults() -> Result<Self, reqwest::Error> {
        Self::new(&FetchConfig::default())
    }

    /// Parses and checks a URL against the allowlist without touching the network.
    pub fn check_url(&self, raw: &str) -> Result<Url, MergeError> {
        let url = Url::parse(raw.trim())
            .map_err(|e| MergeError::validation(format!("invalid URL '{}': {}", raw, e)))?;
        self.policy
            .check(&url)
            .map_err(|reason| MergeError::validation(format!("URL '{}' rejected: {}", raw, reason)))?;
        Ok(url)
    }

    /// Downloads `raw_url` into `destination`, returning the number of bytes written.
    pub async fn fetch(&self, raw_url: &str, destination: &Path) -> Result<u64, MergeError> {
        let url = match self.check_url(raw_url) {
            Ok(url) => url,
            Err(e) => {
                FETCH_REQUESTS_TOTAL.with_label_values(&["rejected"]).inc();
                return Err(e);
            }
        };

        match self.download(&url, destination).await {
            Ok(bytes) => {
                FETCH_REQUESTS_TOTAL.with_label_values(&["success"]).inc();
                FETCH_BYTES_TOTAL.inc_by(bytes);
                tracing::info!(url = %url, bytes, path = %destination.display(), "Fetched remote video");
                Ok(bytes)
            }
            Err(e) => {
                FETCH_REQUESTS_TOTAL.with_label_values(&["error"]).inc();
                tracing::warn!(url = %url, error = %e, "Remote fetch failed");
                if let Err(rm) = tokio::fs::remove_file(destination).await {
                    if rm.kind() != std::io::ErrorKind::NotFound {
                        tracing::debug!(error = %rm, "Failed to remove partial download");
                    }
                }
                Err(e)
            }
        }
    }

    async fn download(&self, url: &Url, destination: &Path) -> Result<u64, MergeError> {
        tracing::debug!(url = %url, "Sending GET request");
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| MergeError::fetch(url.as_str(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MergeError::fetch(
                url.as_str(),
                format!("unexpected status {}", status),
            ));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_bytes {
                return Err(MergeError::fetch(
                    url.as_str(),
                    format!(
                        "content length {} exceeds limit of {} bytes",
                        length, self.max_bytes
                    ),
                ));
            }
        }

        let mut file = tokio::fs::File::create(destination)
            .await
            .map_err(|e| MergeError::io(format!("creating {}", destination.display()), e))?;

        let mut total: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| MergeError::fetch(url.as_str(), e.to_string()))?
        {
            total += chunk.len() as u64;
            if total > self.max_bytes {
                return Err(MergeError::fetch(
                    url.as_str(),
                    format!("body exceeds limit of {} bytes", self.max_bytes),
                ));
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| MergeError::io(format!("writing {}", destination.display()), e))?;
        }

        file.flush()
            .await
            .map_err(|e| MergeError::io(format!("flushing {}", destination.display()), e))?;

        Ok(total)
    }
}

/// A remote input bound to the fetcher that will download it.
pub struct RemoteSource {
    url: String,
    fetcher: Arc<RemoteFetcher>,
}

impl RemoteSource {
    pub fn new(url: impl Into<String>, fetcher: Arc<RemoteFetcher>) -> Self {
        Self {
            url: url.into(),
            fetcher,
        }
    }
}

#[async_trait]
impl InputSource for RemoteSource {
    fn kind(&self) -> &'static str {
        "remote"
    }

    async fn materialize(&self, destination: &Path) -> Result<PathBuf, MergeError> {
        self.fetcher.fetch(&self.url, destination).await?;
        Ok(destination.to_path_buf())
    }
}
