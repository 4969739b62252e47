//! Dataset download
//!
//! Fetches the complete price-paid CSV payload for a selector from the
//! upstream publication endpoint. One attempt per ingestion run: a failed
//! download fails the attempt, and the next scheduled cycle tries again.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::Client;
use tracing::info;

use super::models::DatasetSelector;

const USER_AGENT: &str = "pps-ingest/0.1";
const DOWNLOAD_TIMEOUT_SECS: u64 = 600;

/// HTTP source for price-paid dataset snapshots
pub struct DatasetSource {
    client: Client,
    base_url: String,
}

impl DatasetSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    /// Selector-derived source URL
    pub fn url_for(&self, selector: DatasetSelector) -> String {
        format!("{}/{}", self.base_url, selector.file_name())
    }

    /// Download the full byte payload for a selector.
    pub async fn download(&self, selector: DatasetSelector) -> Result<Vec<u8>> {
        let url = self.url_for(selector);
        info!(url = %url, "Downloading dataset");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to request dataset: {}", url))?;

        if !response.status().is_success() {
            bail!(
                "Dataset download failed with HTTP {}: {}",
                response.status(),
                url
            );
        }

        let bytes = response
            .bytes()
            .await
            .context("Failed to read dataset body")?;

        info!(url = %url, size_bytes = bytes.len(), "Dataset downloaded");

        Ok(bytes.to_vec())
    }
}
