//! Error types for the availability pipeline
//!
//! This module defines all error types used throughout the library.
//! AvailabilityError implements Serialize so run reports can be emitted as JSON.

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Error type for availability pipeline operations
#[derive(Error, Debug)]
pub enum AvailabilityError {
    /// HTTP transport failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("Upstream returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// All attempts for one query date failed
    #[error("Fetch failed for {date} after {attempts} attempt(s): {cause}")]
    Fetch {
        date: String,
        attempts: u32,
        #[source]
        cause: Box<AvailabilityError>,
    },

    /// Response body is structurally unreadable
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Anchor date does not match the expected format
    #[error("Invalid date '{input}': expected format {format}")]
    DateParse { input: String, format: String },

    /// Date window exceeds the allowed length
    #[error("Invalid date window: {0}")]
    InvalidWindow(String),

    /// Nothing survived filtering
    #[error("No results for the selected entities")]
    EmptyResult,

    /// Invalid configuration or catalog content
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Filesystem error while reading configuration
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV writer failed
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    /// Spreadsheet writer failed
    #[error("Spreadsheet export failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

/// Serialize AvailabilityError as its display string
impl Serialize for AvailabilityError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Result type alias for availability pipeline operations
pub type Result<T> = std::result::Result<T, AvailabilityError>;
