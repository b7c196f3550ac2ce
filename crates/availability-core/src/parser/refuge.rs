//! Refuge availability page parser
//!
//! The refuge booking site answers with an HTML page holding one block per
//! refuge. Field extraction is selector- and regex-based and therefore
//! tied to the current markup.

use scraper::{ElementRef, Html, Selector};

use crate::error::{AvailabilityError, Result};
use crate::types::AvailabilityRecord;

use super::clean_text;

/// Selectors matching one refuge block, tried together
const BLOCK_SELECTOR: &str = "div.refuge, article.refuge, li.refuge, tr.refuge, .refuge-item";

const NAME_SELECTORS: [&str; 4] = [".refuge-name", ".nom", "h3", "h2"];
const ALTITUDE_SELECTORS: [&str; 2] = [".altitude", ".alt"];
const LOCATION_SELECTORS: [&str; 3] = [".massif", ".location", ".region"];
const CAPACITY_SELECTORS: [&str; 2] = [".capacity", ".capacite"];
const AVAILABILITY_SELECTORS: [&str; 3] = [".dispo", ".availability", ".places"];

/// Parse a refuge availability page.
///
/// Blocks without a name are skipped; every other field is optional.
///
/// # Arguments
/// * `html` - Raw HTML content of the availability page
/// * `query_date` - Date the page was requested for
///
/// # Returns
/// * `Ok(Vec<AvailabilityRecord>)` in document order, possibly empty
/// * `Err(AvailabilityError::Parse)` if the body is not markup at all
pub fn parse_refuge_page(html: &str, query_date: &str) -> Result<Vec<AvailabilityRecord>> {
    if !html.contains('<') {
        return Err(AvailabilityError::Parse(
            "response is not an HTML document".to_string(),
        ));
    }

    let document = Html::parse_document(html);
    let block_selector = Selector::parse(BLOCK_SELECTOR)
        .map_err(|e| AvailabilityError::Parse(format!("Invalid selector: {:?}", e)))?;

    let records = document
        .select(&block_selector)
        .filter_map(|block| parse_block(&block, query_date))
        .collect();

    Ok(records)
}

/// Parse a single refuge block.
fn parse_block(block: &ElementRef, query_date: &str) -> Option<AvailabilityRecord> {
    let entity_name = first_text(block, &NAME_SELECTORS)?;

    let blurb = first_text(block, &AVAILABILITY_SELECTORS);
    let available = blurb.as_deref().and_then(availability_from_blurb);
    let reported_date = blurb.as_deref().and_then(parse_reported_date);

    let capacity = first_text(block, &CAPACITY_SELECTORS)
        .as_deref()
        .and_then(parse_count);

    Some(AvailabilityRecord {
        entity_name,
        entity_id: block_entity_id(block),
        query_date: query_date.to_string(),
        altitude: first_text(block, &ALTITUDE_SELECTORS),
        location: first_text(block, &LOCATION_SELECTORS),
        capacity,
        available,
        status: blurb,
        reported_date,
        ..Default::default()
    })
}

/// Text of the first non-blank element matching one of `selectors`.
fn first_text(block: &ElementRef, selectors: &[&str]) -> Option<String> {
    for selector_str in selectors {
        if let Ok(selector) = Selector::parse(selector_str) {
            for el in block.select(&selector) {
                if let Some(text) = clean_text(&el.text().collect::<String>()) {
                    return Some(text);
                }
            }
        }
    }
    None
}

/// Upstream id from an inline handler, falling back to `data-id`.
fn block_entity_id(block: &ElementRef) -> Option<String> {
    if let Ok(selector) = Selector::parse("[onclick]") {
        let from_handler = std::iter::once(*block)
            .chain(block.select(&selector))
            .filter_map(|el| el.value().attr("onclick"))
            .find_map(extract_entity_id);
        if from_handler.is_some() {
            return from_handler;
        }
    }

    block
        .value()
        .attr("data-id")
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
}

/// Extract the numeric argument of an inline script invocation.
///
/// # Examples
/// ```
/// use availability_core::parser::extract_entity_id;
///
/// assert_eq!(extract_entity_id("reserverRefuge(1234)"), Some("1234".to_string()));
/// assert_eq!(extract_entity_id("javascript:showDispo('87', 'x')"), Some("87".to_string()));
/// assert_eq!(extract_entity_id("toggle()"), None);
/// ```
pub fn extract_entity_id(script: &str) -> Option<String> {
    let re = regex_lite::Regex::new(r#"\w+\s*\(\s*['"]?(\d+)['"]?"#).ok()?;
    let caps = re.captures(script)?;
    Some(caps.get(1)?.as_str().to_string())
}

/// Leading number before a places/beds word.
///
/// Matches French and English wording, since the upstream pages are French.
///
/// # Examples
/// ```
/// use availability_core::parser::parse_count;
///
/// assert_eq!(parse_count("12 places disponibles"), Some(12));
/// assert_eq!(parse_count("Capacité : 48 lits"), Some(48));
/// assert_eq!(parse_count("3 beds left"), Some(3));
/// assert_eq!(parse_count("Complet"), None);
/// ```
pub fn parse_count(text: &str) -> Option<u32> {
    let re = regex_lite::Regex::new(r"(?i)(\d+)\s*(?:places?|lits?|beds?|couchages?)\b").ok()?;
    let caps = re.captures(text)?;
    caps.get(1)?.as_str().parse().ok()
}

/// Parenthesized `dd/mm/yyyy` token inside an availability blurb.
///
/// # Examples
/// ```
/// use availability_core::parser::parse_reported_date;
///
/// assert_eq!(parse_reported_date("12 places (14/06/2025)"), Some("14/06/2025".to_string()));
/// assert_eq!(parse_reported_date("12 places"), None);
/// ```
pub fn parse_reported_date(text: &str) -> Option<String> {
    let re = regex_lite::Regex::new(r"\(\s*(\d{1,2}/\d{1,2}/\d{4})\s*\)").ok()?;
    let caps = re.captures(text)?;
    Some(caps.get(1)?.as_str().to_string())
}

/// Free places from the blurb; "complet"/"full" counts as zero.
fn availability_from_blurb(blurb: &str) -> Option<u32> {
    if let Some(count) = parse_count(blurb) {
        return Some(count);
    }
    let lower = blurb.to_lowercase();
    if lower.contains("complet") || lower.contains("full") {
        Some(0)
    } else {
        None
    }
}
