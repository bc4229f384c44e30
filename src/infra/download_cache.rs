// ============================================================
// Layer 6 — Download Cache
// ============================================================
// Remote documents are fetched once and kept on disk:
//
//   .cache/documents/
//     <blake3(url) hex>/
//       document        ← raw bytes as served
//
// A hit never touches the network. A failed write only costs
// the next run a re-download, so it is logged and ignored.

use anyhow::{Context, Result};
use std::{path::PathBuf, time::Duration};

use crate::domain::error::{CollaboratorError, CollaboratorResult};

const DOCUMENT_FILE: &str = "document";

pub struct DownloadCache {
    /// Root directory holding one sub-directory per URL
    dir: PathBuf,
    client: reqwest::Client,
}

impl DownloadCache {
    /// `timeout` bounds every single download.
    pub fn new(dir: impl Into<PathBuf>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("evidence-qa/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Cannot build HTTP client for the download cache")?;
        Ok(Self { dir: dir.into(), client })
    }

    /// Where the bytes for `url` live (or would live) on disk.
    pub fn path_for(&self, url: &str) -> PathBuf {
        let key = blake3::hash(url.as_bytes()).to_hex();
        self.dir.join(key.as_str()).join(DOCUMENT_FILE)
    }

    /// Cached bytes for `url`, if any.
    pub async fn get(&self, url: &str) -> Option<Vec<u8>> {
        tokio::fs::read(self.path_for(url)).await.ok()
    }

    /// Store `bytes` for `url`.
    pub async fn put(&self, url: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(url);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Cannot create cache directory '{}'", parent.display()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        Ok(())
    }

    /// Bytes for `url`, from disk when cached, otherwise downloaded and cached.
    pub async fn fetch(&self, url: &str) -> CollaboratorResult<Vec<u8>> {
        if let Some(bytes) = self.get(url).await {
            tracing::debug!("Cache hit: {}", url);
            return Ok(bytes);
        }

        tracing::debug!("Downloading {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CollaboratorError::transport(format!("GET {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::transport(format!("GET {url}: HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CollaboratorError::transport(format!("GET {url}: {e}")))?
            .to_vec();

        if let Err(e) = self.put(url, &bytes).await {
            tracing::warn!("Not caching {}: {:#}", url, e);
        }
        Ok(bytes)
    }
}
