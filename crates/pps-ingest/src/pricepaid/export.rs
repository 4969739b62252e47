//! Export strategies
//!
//! Serializes enriched transactions into bounded-size textual chunks ready
//! for the search indexer. Two built-in strategies share the
//! [`ExportFormat`] shape: delimited CSV (every field double-quoted, fixed
//! column order) and JSON (null fields omitted, geo as a nested Point).
//! Chunking is order-preserving: chunk `i` holds rows
//! `[i * CHUNK_ROWS, (i + 1) * CHUNK_ROWS)` of the enriched sequence.

use anyhow::{Context, Result};
use serde::Serialize;

use super::models::{EnrichedTransaction, GeoPoint};

/// Maximum rows per exported chunk
pub const CHUNK_ROWS: usize = 25_000;

/// Column order shared by the CSV header and the JSON field names
pub const CSV_HEADER: &str = "TransactionId,Price,DateOfTransfer,PostCode,PropertyType,Build,Contract,Building,Street,Locality,Town,District,County,Geo";

/// Pluggable per-format serialization strategy
pub trait ExportFormat: Send + Sync {
    /// Serialize one enriched row into a format-specific record
    fn serialize_row(&self, row: &EnrichedTransaction) -> Result<String>;

    /// Assemble up to [`CHUNK_ROWS`] serialized records into one chunk
    /// payload, prepending a header row for tabular formats.
    fn assemble_chunk(&self, records: &[String]) -> String;

    /// File extension tag used in chunk object names
    fn extension(&self) -> &'static str;
}

/// Which built-in strategy a deployment writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportKind {
    #[default]
    Csv,
    Json,
}

impl ExportKind {
    pub fn format(&self) -> &'static dyn ExportFormat {
        match self {
            ExportKind::Csv => &CsvExport,
            ExportKind::Json => &JsonExport,
        }
    }
}

impl std::str::FromStr for ExportKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportKind::Csv),
            "json" => Ok(ExportKind::Json),
            _ => Err(anyhow::anyhow!("Invalid export format: {}", s)),
        }
    }
}

/// Serialize rows and group them into ordered, bounded-size chunks.
pub fn export_chunks(
    format: &dyn ExportFormat,
    rows: &[EnrichedTransaction],
) -> Result<Vec<String>> {
    rows.chunks(CHUNK_ROWS)
        .map(|chunk| {
            let records = chunk
                .iter()
                .map(|row| format.serialize_row(row))
                .collect::<Result<Vec<_>>>()?;
            Ok(format.assemble_chunk(&records))
        })
        .collect()
}

/// GeoJSON-style point, coordinates ordered `[longitude, latitude]`
#[derive(Serialize)]
struct GeoJson {
    #[serde(rename = "type")]
    kind: &'static str,
    coordinates: [f64; 2],
}

impl From<GeoPoint> for GeoJson {
    fn from(geo: GeoPoint) -> Self {
        GeoJson {
            kind: "Point",
            coordinates: [geo.long, geo.lat],
        }
    }
}

// ============================================================================
// CSV
// ============================================================================

/// Delimited-text strategy: fixed 14-column order, every field wrapped in
/// double quotes with embedded quotes doubled. The Geo cell carries the
/// point as embedded JSON inside the quoted field.
pub struct CsvExport;

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

impl ExportFormat for CsvExport {
    fn serialize_row(&self, row: &EnrichedTransaction) -> Result<String> {
        let t = &row.transaction;

        let geo = match row.geo {
            Some(geo) => serde_json::to_string(&GeoJson::from(geo))
                .context("Failed to serialize geo point")?,
            None => String::new(),
        };

        let fields = [
            t.transaction_id.clone(),
            t.price.to_string(),
            t.date_of_transfer.to_string(),
            t.postcode.clone().unwrap_or_default(),
            t.property_type
                .map(|p| p.description().to_string())
                .unwrap_or_default(),
            t.build.description().to_string(),
            t.contract.description().to_string(),
            t.building.clone(),
            t.street.clone().unwrap_or_default(),
            t.locality.clone().unwrap_or_default(),
            t.town.clone(),
            t.district.clone(),
            t.county.clone(),
            geo,
        ];

        Ok(fields
            .iter()
            .map(|f| quote(f))
            .collect::<Vec<_>>()
            .join(","))
    }

    fn assemble_chunk(&self, records: &[String]) -> String {
        let mut chunk = String::from(CSV_HEADER);
        for record in records {
            chunk.push('\n');
            chunk.push_str(record);
        }
        chunk
    }

    fn extension(&self) -> &'static str {
        "csv"
    }
}

// ============================================================================
// JSON
// ============================================================================

/// Structured strategy: one object per row, absent fields omitted entirely
/// rather than emitted as null, field names matching the CSV header.
pub struct JsonExport;

#[derive(Serialize)]
struct JsonRow<'a> {
    #[serde(rename = "TransactionId")]
    transaction_id: &'a str,
    #[serde(rename = "Price")]
    price: i64,
    #[serde(rename = "DateOfTransfer")]
    date_of_transfer: String,
    #[serde(rename = "PostCode", skip_serializing_if = "Option::is_none")]
    postcode: Option<&'a str>,
    #[serde(rename = "PropertyType", skip_serializing_if = "Option::is_none")]
    property_type: Option<&'static str>,
    #[serde(rename = "Build")]
    build: &'static str,
    #[serde(rename = "Contract")]
    contract: &'static str,
    #[serde(rename = "Building", skip_serializing_if = "Option::is_none")]
    building: Option<&'a str>,
    #[serde(rename = "Street", skip_serializing_if = "Option::is_none")]
    street: Option<&'a str>,
    #[serde(rename = "Locality", skip_serializing_if = "Option::is_none")]
    locality: Option<&'a str>,
    #[serde(rename = "Town")]
    town: &'a str,
    #[serde(rename = "District")]
    district: &'a str,
    #[serde(rename = "County")]
    county: &'a str,
    #[serde(rename = "Geo", skip_serializing_if = "Option::is_none")]
    geo: Option<GeoJson>,
}

impl ExportFormat for JsonExport {
    fn serialize_row(&self, row: &EnrichedTransaction) -> Result<String> {
        let t = &row.transaction;

        let json_row = JsonRow {
            transaction_id: &t.transaction_id,
            price: t.price,
            date_of_transfer: t.date_of_transfer.to_string(),
            postcode: t.postcode.as_deref(),
            property_type: t.property_type.map(|p| p.description()),
            build: t.build.description(),
            contract: t.contract.description(),
            building: (!t.building.is_empty()).then_some(t.building.as_str()),
            street: t.street.as_deref(),
            locality: t.locality.as_deref(),
            town: &t.town,
            district: &t.district,
            county: &t.county,
            geo: row.geo.map(GeoJson::from),
        };

        serde_json::to_string(&json_row).context("Failed to serialize row")
    }

    fn assemble_chunk(&self, records: &[String]) -> String {
        format!("[{}]", records.join(","))
    }

    fn extension(&self) -> &'static str {
        "json"
    }
}
