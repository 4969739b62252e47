//! Worker configuration
//!
//! All settings come from the environment; secrets (storage keys, search
//! API key, database URL) are supplied by the host's secret store and read
//! once at startup.

use std::time::Duration;

use crate::pricepaid::export::ExportKind;

/// Default upstream publication endpoint for price-paid dataset files
pub const DEFAULT_DATASET_BASE_URL: &str =
    "http://prod.publicdata.landregistry.gov.uk.s3-website-eu-west-1.amazonaws.com";

/// Default seconds between scheduled ingestion cycles (7 days)
const DEFAULT_CYCLE_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// Main worker configuration
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Seconds between scheduled ingestion cycles
    pub cycle_interval_secs: u64,
    /// Base URL the dataset files are published under
    pub dataset_base_url: String,
    /// Connection URL for the postcode lookup database
    pub database_url: String,
    /// Which export strategy this deployment writes
    pub export_format: ExportKind,
}

impl IngestConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Self {
            cycle_interval_secs: std::env::var("INGEST_CYCLE_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CYCLE_INTERVAL_SECS),
            dataset_base_url: std::env::var("INGEST_DATASET_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATASET_BASE_URL.to_string()),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/postcodes".to_string()),
            export_format: std::env::var("INGEST_EXPORT_FORMAT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.cycle_interval_secs == 0 {
            anyhow::bail!("INGEST_CYCLE_INTERVAL_SECS must be greater than 0");
        }
        if self.dataset_base_url.is_empty() {
            anyhow::bail!("INGEST_DATASET_BASE_URL cannot be empty");
        }
        if self.database_url.is_empty() {
            anyhow::bail!("DATABASE_URL cannot be empty");
        }
        Ok(())
    }

    /// Get the cycle interval as a Duration
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            cycle_interval_secs: DEFAULT_CYCLE_INTERVAL_SECS,
            dataset_base_url: DEFAULT_DATASET_BASE_URL.to_string(),
            database_url: "postgresql://localhost/postcodes".to_string(),
            export_format: ExportKind::default(),
        }
    }
}
