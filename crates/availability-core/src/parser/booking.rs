//! Hotel booking API response parser
//!
//! The booking API answers with `roomStays`, each holding a list of
//! `rates`. Every rate becomes one record.

use serde_json::Value;

use crate::error::{AvailabilityError, Result};
use crate::types::AvailabilityRecord;

use super::{clean_text, ParseContext};

/// Parse a booking API response body.
///
/// A missing or null `roomStays` means no availability and yields no
/// records. Amounts may be numbers or numeric strings.
///
/// # Errors
/// `AvailabilityError::Parse` if the body is not JSON or its root is not an object.
pub fn parse_booking_response(body: &str, context: &ParseContext<'_>) -> Result<Vec<AvailabilityRecord>> {
    let data: Value = serde_json::from_str(body)
        .map_err(|e| AvailabilityError::Parse(format!("invalid JSON: {}", e)))?;

    let root = match &data {
        Value::Null => return Ok(Vec::new()),
        Value::Object(map) => map,
        _ => {
            return Err(AvailabilityError::Parse(
                "expected a JSON object at the root".to_string(),
            ))
        }
    };

    let Some(stays) = root.get("roomStays").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    let mut records = Vec::new();
    for room in stays {
        let room_type = string_field(room, "title");
        let max_guests = room
            .get("maxGuests")
            .and_then(parse_amount)
            .filter(|n| *n >= 0.0)
            .map(|n| n as u32);

        let Some(rates) = room.get("rates").and_then(Value::as_array) else {
            continue;
        };

        for rate in rates {
            records.push(AvailabilityRecord {
                entity_name: context.entity_name.to_string(),
                entity_id: context.entity_id.map(str::to_string),
                query_date: context.query_date.to_string(),
                room_type: room_type.clone(),
                total: rate.get("total").and_then(parse_amount),
                taxes: rate.get("taxes").and_then(parse_amount),
                fees: rate.get("fees").and_then(parse_amount),
                max_guests,
                short_description: string_field(rate, "shortDescription"),
                long_description: string_field(rate, "longDescription"),
                image: string_field(rate, "image"),
                ..Default::default()
            });
        }
    }

    Ok(records)
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => clean_text(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Read a monetary amount from a JSON number or a formatted string.
///
/// Currency symbols, spaces and comma thousands separators are ignored.
/// Strings that use a comma as decimal mark (`"1.234,50"`, `"12,5"`) are
/// ambiguous and yield `None`.
///
/// # Examples
/// ```
/// use availability_core::parser::parse_amount;
/// use serde_json::json;
///
/// assert_eq!(parse_amount(&json!(5400.5)), Some(5400.5));
/// assert_eq!(parse_amount(&json!("HK$ 5,400.00")), Some(5400.0));
/// assert_eq!(parse_amount(&json!(null)), None);
/// ```
pub fn parse_amount(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            if !commas_group_thousands(s) {
                return None;
            }
            let digits: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            digits.parse().ok()
        }
        _ => None,
    }
}

/// Every comma is followed by exactly three digits and sits before any `.`
fn commas_group_thousands(s: &str) -> bool {
    if let (Some(comma), Some(dot)) = (s.rfind(','), s.find('.')) {
        if comma > dot {
            return false;
        }
    }
    s.split(',').skip(1).all(|group| {
        let digits = group.chars().take_while(char::is_ascii_digit).count();
        digits == 3
    })
}
