//! Price-paid dataset ingestion
//!
//! Domain modules for the Land Registry price-paid pipeline: models,
//! parsing, geo enrichment, export strategies, artifact persistence and
//! the per-attempt orchestrator.

pub mod download;
pub mod enrich;
pub mod export;
pub mod models;
pub mod orchestrator;
pub mod parser;
pub mod store;

pub use models::{DatasetSelector, IngestOutcome};
pub use orchestrator::IngestionOrchestrator;
