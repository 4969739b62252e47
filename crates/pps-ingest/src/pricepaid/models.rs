//! Domain models for price-paid transactions
//!
//! A [`Transaction`] is one row of the Land Registry price-paid dataset.
//! Enrichment attaches an optional [`GeoPoint`] resolved from the postcode,
//! producing an [`EnrichedTransaction`].

use chrono::NaiveDate;

/// Property type, carried in the source data as a single-character code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    Detached,
    SemiDetached,
    Terraced,
    FlatsMaisonettes,
    Other,
}

impl PropertyType {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "D" => Some(PropertyType::Detached),
            "S" => Some(PropertyType::SemiDetached),
            "T" => Some(PropertyType::Terraced),
            "F" => Some(PropertyType::FlatsMaisonettes),
            "O" => Some(PropertyType::Other),
            _ => None,
        }
    }

    pub fn code(&self) -> char {
        match self {
            PropertyType::Detached => 'D',
            PropertyType::SemiDetached => 'S',
            PropertyType::Terraced => 'T',
            PropertyType::FlatsMaisonettes => 'F',
            PropertyType::Other => 'O',
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PropertyType::Detached => "Detached",
            PropertyType::SemiDetached => "Semi-Detached",
            PropertyType::Terraced => "Terraced",
            PropertyType::FlatsMaisonettes => "Flats/Maisonettes",
            PropertyType::Other => "Other",
        }
    }
}

/// Whether the sale was of a newly built property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildType {
    NewBuild,
    OldBuild,
}

impl BuildType {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "Y" => Some(BuildType::NewBuild),
            "N" => Some(BuildType::OldBuild),
            _ => None,
        }
    }

    pub fn code(&self) -> char {
        match self {
            BuildType::NewBuild => 'Y',
            BuildType::OldBuild => 'N',
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            BuildType::NewBuild => "New Build",
            BuildType::OldBuild => "Old Build",
        }
    }
}

/// Tenure under which the property was transferred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractType {
    Freehold,
    Leasehold,
}

impl ContractType {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "F" => Some(ContractType::Freehold),
            "L" => Some(ContractType::Leasehold),
            _ => None,
        }
    }

    pub fn code(&self) -> char {
        match self {
            ContractType::Freehold => 'F',
            ContractType::Leasehold => 'L',
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ContractType::Freehold => "Freehold",
            ContractType::Leasehold => "Leasehold",
        }
    }
}

/// A resolved geographic point.
///
/// Construction enforces the validity filter: both components must lie
/// strictly inside (-90, 90) and be non-zero. The postcode store uses
/// `(0, 0)` as its "no data" sentinel, so a literal zero component means
/// missing data, not the equator or prime meridian.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub long: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, long: f64) -> Option<Self> {
        fn usable(v: f64) -> bool {
            v > -90.0 && v < 90.0 && v != 0.0
        }

        if usable(lat) && usable(long) {
            Some(GeoPoint { lat, long })
        } else {
            None
        }
    }
}

/// One price-paid sale, as parsed from the source dataset.
///
/// `building` is composed at parse time from the dataset's two optional
/// building columns (primary and secondary addressable object names).
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub transaction_id: String,
    pub price: i64,
    pub date_of_transfer: NaiveDate,
    pub postcode: Option<String>,
    pub property_type: Option<PropertyType>,
    pub build: BuildType,
    pub contract: ContractType,
    pub building: String,
    pub street: Option<String>,
    pub locality: Option<String>,
    pub town: String,
    pub district: String,
    pub county: String,
}

/// A transaction paired with its resolved geo point, if any
#[derive(Debug, Clone)]
pub struct EnrichedTransaction {
    pub transaction: Transaction,
    pub geo: Option<GeoPoint>,
}

/// Which upstream dataset snapshot to ingest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetSelector {
    /// The rolling monthly update file
    LatestMonth,
    /// The complete file for one calendar year
    Year(u16),
}

impl DatasetSelector {
    /// Source file name under the dataset base URL
    pub fn file_name(&self) -> String {
        match self {
            DatasetSelector::LatestMonth => "pp-monthly-update-new-version.csv".to_string(),
            DatasetSelector::Year(year) => format!("pp-{}.csv", year),
        }
    }
}

/// Outcome of one ingestion attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The dataset hash was already marked as ingested; no work performed
    NothingToDo { hash: String },
    /// The dataset was enriched, exported and marked
    Completed { hash: String, rows: usize },
}
