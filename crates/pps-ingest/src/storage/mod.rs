//! Object storage façade
//!
//! [`ObjectStore`] is the narrow seam the ingestion core writes through:
//! named blob writes (overwriting, last writer wins) and prefix listing.
//! [`S3ObjectStore`] is the production implementation; tests substitute an
//! in-memory store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::{
    config::{Credentials, Region},
    primitives::ByteStream,
    Client,
};
use tracing::{debug, info};

pub mod config;

pub use config::StorageConfig;

/// Durable named-object storage: write and list, nothing else.
///
/// Writes are idempotent from the caller's perspective; re-writing a name
/// overwrites whatever is there with no optimistic concurrency check.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Persist `body` under `name`, overwriting any existing object.
    async fn put(&self, name: &str, body: Vec<u8>) -> Result<()>;

    /// List all object names starting with `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// S3-compatible object store bound to a single bucket
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(config: StorageConfig) -> Self {
        debug!("Initializing object store for bucket: {}", config.bucket);

        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "pps-storage",
        );

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .force_path_style(config.path_style);

        if let Some(endpoint) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(s3_config_builder.build());

        info!("Object store initialized for bucket: {}", config.bucket);

        Self {
            client,
            bucket: config.bucket,
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, name: &str, body: Vec<u8>) -> Result<()> {
        debug!(
            "Writing {} bytes to s3://{}/{}",
            body.len(),
            self.bucket,
            name
        );

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(name)
            .body(ByteStream::from(body))
            .send()
            .await
            .with_context(|| format!("Failed to write object: {}", name))?;

        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        debug!("Listing objects in s3://{}/{}", self.bucket, prefix);

        let mut names = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);

            if let Some(token) = &continuation_token {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .context("Failed to list objects")?;

            names.extend(
                response
                    .contents()
                    .iter()
                    .filter_map(|obj| obj.key().map(|k| k.to_string())),
            );

            match response.next_continuation_token() {
                Some(token) => continuation_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(names)
    }
}
