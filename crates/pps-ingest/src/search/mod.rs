//! Search index provisioning
//!
//! Management-API client for the hosted search service plus the idempotent
//! provisioner run once at worker startup: ensure the properties index
//! (with its autocomplete suggester), the data source bound to the storage
//! container the worker writes into, and an hourly indexer that pulls newly
//! written chunks into the index. Provisioning does not reconcile schema
//! drift on an already-existing index.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::pricepaid::export::ExportKind;
use crate::storage::StorageConfig;

pub const INDEX_NAME: &str = "properties-index";
pub const DATA_SOURCE_NAME: &str = "properties-data";
pub const INDEXER_NAME: &str = "properties-indexer";

const API_VERSION: &str = "2023-11-01";
const SUGGESTER_NAME: &str = "suggester";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Search service connection settings
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Management endpoint, e.g. `https://<service>.search.windows.net`
    pub endpoint: String,
    pub api_key: String,
}

impl SearchConfig {
    pub fn from_env() -> Result<Self> {
        let endpoint = match std::env::var("SEARCH_ENDPOINT") {
            Ok(endpoint) => endpoint,
            Err(_) => {
                let name = std::env::var("SEARCH_SERVICE_NAME")
                    .context("SEARCH_ENDPOINT or SEARCH_SERVICE_NAME must be set")?;
                format!("https://{}.search.windows.net", name)
            }
        };

        let api_key = std::env::var("SEARCH_API_KEY").context("SEARCH_API_KEY must be set")?;

        let config = Self { endpoint, api_key };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            bail!("Search endpoint cannot be empty");
        }
        if self.api_key.is_empty() {
            bail!("Search API key cannot be empty");
        }
        Ok(())
    }
}

// ============================================================================
// Definitions
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDefinition {
    pub name: String,
    pub fields: Vec<FieldDefinition>,
    pub suggesters: Vec<Suggester>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub key: bool,
    pub searchable: bool,
    pub filterable: bool,
    pub sortable: bool,
    pub facetable: bool,
}

impl FieldDefinition {
    fn new(name: &str, field_type: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type: field_type.to_string(),
            key: false,
            searchable: false,
            filterable: false,
            sortable: false,
            facetable: false,
        }
    }

    fn key(mut self) -> Self {
        self.key = true;
        self
    }

    fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    fn facetable(mut self) -> Self {
        self.facetable = true;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggester {
    pub name: String,
    pub search_mode: String,
    pub source_fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: String,
    pub credentials: DataSourceCredentials,
    pub container: DataSourceContainer,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceCredentials {
    pub connection_string: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceContainer {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexerDefinition {
    pub name: String,
    pub data_source_name: String,
    pub target_index_name: String,
    pub schedule: IndexerSchedule,
    pub parameters: IndexerParameters,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexerSchedule {
    pub interval: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexerParameters {
    pub configuration: IndexerConfiguration,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexerConfiguration {
    pub parsing_mode: String,
}

// ============================================================================
// Client
// ============================================================================

/// Thin client for the search management REST API
pub struct SearchClient {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl SearchClient {
    pub fn new(config: SearchConfig) -> Result<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build search HTTP client")?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}?api-version={}", self.endpoint, path, API_VERSION)
    }

    pub async fn list_index_names(&self) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct IndexList {
            value: Vec<IndexName>,
        }

        #[derive(Deserialize)]
        struct IndexName {
            name: String,
        }

        let response = self
            .http
            .get(self.url("indexes"))
            .header("api-key", &self.api_key)
            .send()
            .await
            .context("Failed to list search indexes")?;

        if !response.status().is_success() {
            bail!("Listing search indexes failed with HTTP {}", response.status());
        }

        let list: IndexList = response
            .json()
            .await
            .context("Failed to parse index listing")?;

        Ok(list.value.into_iter().map(|i| i.name).collect())
    }

    pub async fn create_or_update_index(&self, index: &IndexDefinition) -> Result<()> {
        self.put_json(&format!("indexes/{}", index.name), index)
            .await
    }

    pub async fn create_or_update_data_source(
        &self,
        data_source: &DataSourceDefinition,
    ) -> Result<()> {
        self.put_json(&format!("datasources/{}", data_source.name), data_source)
            .await
    }

    pub async fn create_or_update_indexer(&self, indexer: &IndexerDefinition) -> Result<()> {
        self.put_json(&format!("indexers/{}", indexer.name), indexer)
            .await
    }

    async fn put_json<T: Serialize>(&self, path: &str, body: &T) -> Result<()> {
        let response = self
            .http
            .put(self.url(path))
            .header("api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Search API request failed: {}", path))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            bail!("Search API {} returned HTTP {}: {}", path, status, detail);
        }

        Ok(())
    }
}

// ============================================================================
// Provisioning
// ============================================================================

/// Ensure the index, data source and indexer exist.
///
/// Returns true when the trio was created, false when the index was already
/// listed and nothing was touched.
pub async fn ensure_search_index(
    client: &SearchClient,
    storage: &StorageConfig,
    export_kind: ExportKind,
) -> Result<bool> {
    let existing = client.list_index_names().await?;

    if existing.iter().any(|name| name == INDEX_NAME) {
        info!(index = INDEX_NAME, "Search index already exists, skipping provisioning");
        return Ok(false);
    }

    client.create_or_update_index(&property_index()).await?;
    client
        .create_or_update_data_source(&property_data_source(storage))
        .await?;
    client
        .create_or_update_indexer(&property_indexer(export_kind))
        .await?;

    info!(
        index = INDEX_NAME,
        indexer = INDEXER_NAME,
        "Search index, data source and indexer provisioned"
    );

    Ok(true)
}

/// Field schema for the properties index, matching the exported column set
fn property_index() -> IndexDefinition {
    let fields = vec![
        FieldDefinition::new("TransactionId", "Edm.String").key(),
        FieldDefinition::new("Price", "Edm.Int64")
            .filterable()
            .sortable()
            .facetable(),
        FieldDefinition::new("DateOfTransfer", "Edm.DateTimeOffset")
            .filterable()
            .sortable(),
        FieldDefinition::new("PostCode", "Edm.String").searchable().filterable(),
        FieldDefinition::new("PropertyType", "Edm.String").filterable().facetable(),
        FieldDefinition::new("Build", "Edm.String").filterable().facetable(),
        FieldDefinition::new("Contract", "Edm.String").filterable().facetable(),
        FieldDefinition::new("Building", "Edm.String").searchable(),
        FieldDefinition::new("Street", "Edm.String").searchable(),
        FieldDefinition::new("Locality", "Edm.String").searchable(),
        FieldDefinition::new("Town", "Edm.String")
            .searchable()
            .filterable()
            .facetable(),
        FieldDefinition::new("District", "Edm.String")
            .searchable()
            .filterable()
            .facetable(),
        FieldDefinition::new("County", "Edm.String")
            .searchable()
            .filterable()
            .facetable(),
        FieldDefinition::new("Geo", "Edm.GeographyPoint").filterable().sortable(),
    ];

    let suggesters = vec![Suggester {
        name: SUGGESTER_NAME.to_string(),
        search_mode: "analyzingInfixMatching".to_string(),
        source_fields: ["Building", "Street", "Locality", "Town", "District", "County"]
            .iter()
            .map(|f| f.to_string())
            .collect(),
    }];

    IndexDefinition {
        name: INDEX_NAME.to_string(),
        fields,
        suggesters,
    }
}

fn property_data_source(storage: &StorageConfig) -> DataSourceDefinition {
    DataSourceDefinition {
        name: DATA_SOURCE_NAME.to_string(),
        source_type: "blob".to_string(),
        credentials: DataSourceCredentials {
            connection_string: storage.connection_string(),
        },
        container: DataSourceContainer {
            name: storage.bucket.clone(),
        },
    }
}

fn property_indexer(export_kind: ExportKind) -> IndexerDefinition {
    let parsing_mode = match export_kind {
        ExportKind::Csv => "delimitedText",
        ExportKind::Json => "jsonArray",
    };

    IndexerDefinition {
        name: INDEXER_NAME.to_string(),
        data_source_name: DATA_SOURCE_NAME.to_string(),
        target_index_name: INDEX_NAME.to_string(),
        schedule: IndexerSchedule {
            interval: "PT1H".to_string(),
        },
        parameters: IndexerParameters {
            configuration: IndexerConfiguration {
                parsing_mode: parsing_mode.to_string(),
            },
        },
    }
}
