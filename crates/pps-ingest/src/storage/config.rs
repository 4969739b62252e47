use serde::{Deserialize, Serialize};
use std::env;

/// Object storage connection settings.
///
/// The worker writes all artifacts into one fixed container; `properties`
/// is the default and what the provisioned indexer is bound to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub endpoint: Option<String>,
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub path_style: bool,
}

impl StorageConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            endpoint: env::var("S3_ENDPOINT").ok(),
            region: env::var("S3_REGION").unwrap_or_else(|_| "eu-west-2".to_string()),
            bucket: env::var("S3_BUCKET").unwrap_or_else(|_| "properties".to_string()),
            access_key: env::var("S3_ACCESS_KEY")
                .or_else(|_| env::var("AWS_ACCESS_KEY_ID"))
                .unwrap_or_else(|_| "minioadmin".to_string()),
            secret_key: env::var("S3_SECRET_KEY")
                .or_else(|_| env::var("AWS_SECRET_ACCESS_KEY"))
                .unwrap_or_else(|_| "minioadmin".to_string()),
            path_style: env::var("S3_PATH_STYLE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        })
    }

    pub fn for_minio(endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            region: "eu-west-2".to_string(),
            bucket: bucket.into(),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            path_style: true,
        }
    }

    /// Connection string handed to the search service so its indexer can
    /// read the container this worker writes into.
    pub fn connection_string(&self) -> String {
        let endpoint = self.endpoint.as_deref().unwrap_or("");
        format!(
            "endpoint={};region={};access_key={};secret_key={}",
            endpoint, self.region, self.access_key, self.secret_key
        )
    }
}
