//! Source configuration
//!
//! Everything that differs between upstream sites (URL, protocol, date
//! format, headers, booking parameters) lives in a `SourceConfig` loaded
//! from JSON, so one pipeline serves every site.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::client::{ClientConfig, HttpMethod, MIN_REQUESTS_PER_SECOND};
use crate::dates::{validate_format, DEFAULT_DATE_FORMAT};
use crate::error::{AvailabilityError, Result};
use crate::retry::RetryPolicy;

/// Response shape of an upstream source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// HTML page with one block per refuge
    RefugeHtml,
    /// JSON booking API returning room stays and rates
    BookingJson,
}

/// Parameters of a JSON booking request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingParams {
    /// Upstream hotel code
    pub hotel_code: String,
    /// Display name stamped on every record
    pub hotel_name: String,
    pub adults: u32,
    pub children: u32,
    pub language: String,
}

impl Default for BookingParams {
    fn default() -> Self {
        Self {
            hotel_code: String::new(),
            hotel_name: String::new(),
            adults: 2,
            children: 0,
            language: "en".to_string(),
        }
    }
}

/// Full description of one upstream source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Human-readable source name, used in logs
    pub name: String,
    pub kind: SourceKind,
    /// Endpoint queried once per date
    pub url: String,
    pub method: HttpMethod,
    /// strftime pattern for anchor parsing and record dates
    pub date_format: String,
    pub client: ClientConfig,
    pub retry: RetryPolicy,
    /// Static fields added to every form request
    pub form_fields: BTreeMap<String, String>,
    pub booking: BookingParams,
    /// Base name of the exported file, without extension
    pub export_name: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            name: "refuges".to_string(),
            kind: SourceKind::RefugeHtml,
            url: String::new(),
            method: HttpMethod::Post,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            client: ClientConfig::default(),
            retry: RetryPolicy::default(),
            form_fields: BTreeMap::new(),
            booking: BookingParams::default(),
            export_name: "availability".to_string(),
        }
    }
}

impl SourceConfig {
    /// Parse and validate a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SourceConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Check the fields that would otherwise fail mid-run.
    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(AvailabilityError::Config(format!(
                "source url must be http(s), got '{}'",
                self.url
            )));
        }
        validate_format(&self.date_format)?;
        let rate = self.client.requests_per_second;
        if rate > 0.0 && rate < MIN_REQUESTS_PER_SECOND {
            return Err(AvailabilityError::Config(format!(
                "requests_per_second must be 0 (unpaced) or at least {}",
                MIN_REQUESTS_PER_SECOND
            )));
        }
        if self.client.timeout_secs == 0 {
            return Err(AvailabilityError::Config("timeout_secs must be positive".to_string()));
        }
        if self.export_name.trim().is_empty() {
            return Err(AvailabilityError::Config("export_name is empty".to_string()));
        }
        if self.kind == SourceKind::BookingJson && self.booking.hotel_code.trim().is_empty() {
            return Err(AvailabilityError::Config(
                "booking sources need booking.hotel_code".to_string(),
            ));
        }
        Ok(())
    }

    /// Display name stamped on booking records
    pub fn hotel_display_name(&self) -> &str {
        if self.booking.hotel_name.is_empty() {
            &self.name
        } else {
            &self.booking.hotel_name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_refuge_config() {
        let config = SourceConfig::from_json(r#"{"url": "https://refuges.example/dispo"}"#).unwrap();
        assert_eq!(config.kind, SourceKind::RefugeHtml);
        assert_eq!(config.method, HttpMethod::Post);
        assert_eq!(config.date_format, "%d/%m/%Y");
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_booking_config() {
        let config = SourceConfig::from_json(
            r#"{
                "name": "Mandarin Oriental Hong Kong",
                "kind": "booking_json",
                "url": "https://www.mandarinoriental.com/api/v1/booking/check-room-availability",
                "date_format": "%Y-%m-%d",
                "client": {"cookie": "session=abc"},
                "booking": {"hotel_code": "514", "hotel_name": "Mandarin Oriental"},
                "export_name": "hongkong_mandarin_oriental_availability"
            }"#,
        )
        .unwrap();
        assert_eq!(config.kind, SourceKind::BookingJson);
        assert_eq!(config.booking.adults, 2);
        assert_eq!(config.booking.language, "en");
        assert_eq!(config.client.cookie.as_deref(), Some("session=abc"));
        assert_eq!(config.client.timeout_secs, 30);
        assert_eq!(config.hotel_display_name(), "Mandarin Oriental");
    }

    #[test]
    fn test_missing_url_rejected() {
        assert!(matches!(
            SourceConfig::from_json("{}"),
            Err(AvailabilityError::Config(_))
        ));
    }

    #[test]
    fn test_booking_without_hotel_code_rejected() {
        let result = SourceConfig::from_json(
            r#"{"kind": "booking_json", "url": "https://hotel.example/api"}"#,
        );
        assert!(matches!(result, Err(AvailabilityError::Config(_))));
    }

    #[test]
    fn test_bad_date_format_rejected() {
        let result = SourceConfig::from_json(
            r#"{"url": "https://refuges.example/dispo", "date_format": "%Q"}"#,
        );
        assert!(matches!(result, Err(AvailabilityError::Config(_))));
    }

    #[test]
    fn test_time_in_date_format_rejected() {
        let result = SourceConfig::from_json(
            r#"{"url": "https://refuges.example/dispo", "date_format": "%d/%m/%Y %H:%M"}"#,
        );
        assert!(matches!(result, Err(AvailabilityError::Config(_))));
    }

    #[test]
    fn test_tiny_request_rate_rejected() {
        let result = SourceConfig::from_json(
            r#"{"url": "https://refuges.example/dispo", "client": {"requests_per_second": 1e-20}}"#,
        );
        assert!(matches!(result, Err(AvailabilityError::Config(_))));

        let unpaced = SourceConfig::from_json(
            r#"{"url": "https://refuges.example/dispo", "client": {"requests_per_second": 0}}"#,
        );
        assert!(unpaced.is_ok());
    }

    #[test]
    fn test_unknown_kind_is_json_error() {
        let result = SourceConfig::from_json(
            r#"{"kind": "carrier_pigeon", "url": "https://refuges.example/dispo"}"#,
        );
        assert!(matches!(result, Err(AvailabilityError::Json(_))));
    }

    #[test]
    fn test_shipped_source_files_are_valid() {
        let refuges = SourceConfig::from_json(include_str!("../../../data/refuges.source.json")).unwrap();
        assert_eq!(refuges.form_fields.get("lang").map(String::as_str), Some("fr"));

        let hotel =
            SourceConfig::from_json(include_str!("../../../data/mandarin_oriental.source.json")).unwrap();
        assert_eq!(hotel.kind, SourceKind::BookingJson);
        assert_eq!(hotel.booking.hotel_code, "514");
        assert_eq!(
            hotel.url,
            "https://www.mandarinoriental.com/api/v1/booking/check-room-availability"
        );
        assert_eq!(hotel.retry.backoff, crate::retry::Backoff::Exponential);
    }
}
