//! Availability Scout Core Library
//!
//! This crate collects day-by-day availability from upstream booking
//! sources (mountain refuge pages, hotel booking APIs) over a window of
//! dates and turns the result into a downloadable table.
//!
//! # Features
//! - Expand an anchor date into a forward or centered date window
//! - Rate-limited HTTP client with per-date retry
//! - HTML and JSON response parsers
//! - Selection filtering with stable numbering
//! - CSV (UTF-8 BOM) and XLSX export

pub mod catalog;
pub mod client;
pub mod config;
pub mod dates;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod parser;
pub mod retry;
pub mod scraper;
pub mod types;

// Re-export main types for convenience
pub use catalog::EntityCatalog;
pub use client::{AvailabilityClient, ClientConfig, RateLimiter};
pub use config::{BookingParams, SourceConfig, SourceKind};
pub use dates::{DateWindow, QueryDate, WindowSpan};
pub use error::{AvailabilityError, Result};
pub use export::{ExportFile, ExportFormat};
pub use fetcher::AvailabilityFetcher;
pub use retry::{Backoff, RetryPolicy};
pub use scraper::{AvailabilityScraper, RunQuery, RunResult};
pub use types::{
    AvailabilityRecord, NumberedRecord, Progress, QueryTarget, ResultSet, RunOutcome, RunReport,
    RunStage, Warning, WarningKind,
};
