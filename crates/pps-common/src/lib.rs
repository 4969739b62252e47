//! PPS Common Library
//!
//! Shared utilities for the property-price-search workspace:
//!
//! - **Logging**: centralized tracing initialization
//! - **Hashing**: content digests for dataset deduplication

pub mod hashing;
pub mod logging;
