//! Response parsers for upstream availability sources
//!
//! Every source-specific extraction rule lives behind [`parse_response`]:
//! - `refuge`: HTML pages with one block per refuge
//! - `booking`: JSON booking API with room stays and rates

pub mod booking;
pub mod refuge;

use crate::config::SourceKind;
use crate::error::{AvailabilityError, Result};
use crate::types::AvailabilityRecord;

// Re-export main parsing functions
pub use booking::{parse_amount, parse_booking_response};
pub use refuge::{extract_entity_id, parse_count, parse_refuge_page, parse_reported_date};

/// What the parser knows about the request that produced a body
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
    /// Query date in the source's format, stamped on every record
    pub query_date: &'a str,
    /// Display name for sources that return a single entity (hotels)
    pub entity_name: &'a str,
    /// Upstream identifier for single-entity sources
    pub entity_id: Option<&'a str>,
}

/// Parse one response body into availability records.
///
/// # Errors
/// `AvailabilityError::Parse` when the body is structurally unreadable;
/// missing fields never fail.
pub fn parse_response(
    kind: SourceKind,
    body: &str,
    context: &ParseContext<'_>,
) -> Result<Vec<AvailabilityRecord>> {
    if body.trim().is_empty() {
        return Err(AvailabilityError::Parse("empty response body".to_string()));
    }

    match kind {
        SourceKind::RefugeHtml => parse_refuge_page(body, context.query_date),
        SourceKind::BookingJson => parse_booking_response(body, context),
    }
}

/// Collapse runs of whitespace and trim; `None` for blank text.
pub(crate) fn clean_text(text: &str) -> Option<String> {
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() || cleaned == "-" {
        None
    } else {
        Some(cleaned)
    }
}
