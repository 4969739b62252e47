//! Price-paid CSV parser
//!
//! Parses the raw dataset payload into [`Transaction`]s. The payload is a
//! header-described CSV with 14 columns:
//!
//! ```text
//! transaction_id,price,date_of_transfer,postcode,property_type,new_build,
//! duration,paon,saon,street,locality,town,district,county
//! ```
//!
//! Empty cells are nulls for the nullable columns. A row with an
//! unparseable required field is an error for the whole parse: the caller
//! aborts the ingestion attempt rather than skipping rows, so a dataset is
//! either ingested completely or not at all.

use chrono::NaiveDate;
use thiserror::Error;

use super::models::{BuildType, ContractType, PropertyType, Transaction};

/// Column count of the input schema
pub const EXPECTED_COLUMNS: usize = 14;

/// Errors raised while parsing the dataset payload
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("CSV read error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: expected 14 columns, found {found}")]
    ColumnCount { row: usize, found: usize },

    #[error("row {row}: missing required field '{field}'")]
    MissingField { row: usize, field: &'static str },

    #[error("row {row}: invalid price '{value}'")]
    InvalidPrice { row: usize, value: String },

    #[error("row {row}: invalid transfer date '{value}'")]
    InvalidDate { row: usize, value: String },

    #[error("row {row}: unknown {field} code '{value}'")]
    UnknownCode {
        row: usize,
        field: &'static str,
        value: String,
    },
}

/// Parse the full dataset payload eagerly into transactions, preserving
/// input order.
pub fn parse_transactions(payload: &[u8]) -> Result<Vec<Transaction>, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(payload);

    let mut transactions = Vec::new();

    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        // 1-based source line, accounting for the header row
        let row = idx + 2;
        transactions.push(parse_record(&record, row)?);
    }

    Ok(transactions)
}

fn parse_record(record: &csv::StringRecord, row: usize) -> Result<Transaction, ParseError> {
    if record.len() != EXPECTED_COLUMNS {
        return Err(ParseError::ColumnCount {
            row,
            found: record.len(),
        });
    }

    let cell = |idx: usize| record.get(idx).unwrap_or("").trim();
    let optional = |idx: usize| {
        let value = cell(idx);
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    };
    let required = |idx: usize, field: &'static str| {
        let value = cell(idx);
        if value.is_empty() {
            Err(ParseError::MissingField { row, field })
        } else {
            Ok(value.to_string())
        }
    };

    let transaction_id = required(0, "transaction_id")?;

    let price_raw = required(1, "price")?;
    let price: i64 = price_raw.parse().map_err(|_| ParseError::InvalidPrice {
        row,
        value: price_raw.clone(),
    })?;

    let date_raw = required(2, "date_of_transfer")?;
    let date_of_transfer =
        NaiveDate::parse_from_str(&date_raw, "%Y-%m-%d").map_err(|_| ParseError::InvalidDate {
            row,
            value: date_raw.clone(),
        })?;

    let postcode = optional(3);

    let property_type = match cell(4) {
        "" => None,
        code => Some(
            PropertyType::from_code(code).ok_or_else(|| ParseError::UnknownCode {
                row,
                field: "property_type",
                value: code.to_string(),
            })?,
        ),
    };

    let build_raw = required(5, "new_build")?;
    let build = BuildType::from_code(&build_raw).ok_or_else(|| ParseError::UnknownCode {
        row,
        field: "new_build",
        value: build_raw.clone(),
    })?;

    let duration_raw = required(6, "duration")?;
    let contract = ContractType::from_code(&duration_raw).ok_or_else(|| ParseError::UnknownCode {
        row,
        field: "duration",
        value: duration_raw.clone(),
    })?;

    // Building identity is the primary and secondary addressable object
    // names joined; either may be absent.
    let building = [optional(7), optional(8)]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");

    Ok(Transaction {
        transaction_id,
        price,
        date_of_transfer,
        postcode,
        property_type,
        build,
        contract,
        building,
        street: optional(9),
        locality: optional(10),
        town: required(11, "town")?,
        district: required(12, "district")?,
        county: required(13, "county")?,
    })
}
