//! Per-date availability fetching
//!
//! Builds the upstream request for one query date and sends it through
//! the retry policy. A date whose attempts are all exhausted fails with
//! `AvailabilityError::Fetch` carrying the date and last cause.

use log::debug;
use serde_json::json;

use crate::client::{AvailabilityClient, RequestBody, UpstreamRequest};
use crate::config::{SourceConfig, SourceKind};
use crate::dates::QueryDate;
use crate::error::{AvailabilityError, Result};
use crate::retry::RetryPolicy;

/// Build the request for `date`.
///
/// Deterministic: the same config, date and ids always give the same request.
/// Refuge sources get separate `day`/`month`/`year` fields plus the
/// comma-joined upstream `ids`; booking sources get a one-night stay payload.
pub fn build_request(config: &SourceConfig, date: &QueryDate, ids: &str) -> Result<UpstreamRequest> {
    let body = match config.kind {
        SourceKind::RefugeHtml => {
            let mut fields = vec![
                ("day".to_string(), date.day()),
                ("month".to_string(), date.month()),
                ("year".to_string(), date.year()),
                ("ids".to_string(), ids.to_string()),
            ];
            fields.extend(
                config
                    .form_fields
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone())),
            );
            RequestBody::Form(fields)
        }
        SourceKind::BookingJson => {
            let stay_end = date.next_day_iso().ok_or_else(|| {
                AvailabilityError::InvalidWindow(format!("no day after {}", date))
            })?;
            RequestBody::Json(json!({
                "hotelCode": config.booking.hotel_code,
                "roomCodes": null,
                "roomName": null,
                "bedType": null,
                "rateCode": null,
                "adultGuestCount": config.booking.adults.to_string(),
                "childGuestCount": config.booking.children.to_string(),
                "stayDateStart": date.iso(),
                "stayDateEnd": stay_end,
                "primaryLanguageId": config.booking.language,
            }))
        }
    };

    Ok(UpstreamRequest {
        method: config.method,
        url: config.url.clone(),
        body,
    })
}

/// Fetches response bodies for one source, one date at a time
pub struct AvailabilityFetcher {
    client: AvailabilityClient,
    config: SourceConfig,
    retry: RetryPolicy,
}

impl AvailabilityFetcher {
    /// Create a fetcher whose client and retry policy come from `config`
    pub fn new(config: SourceConfig) -> Result<Self> {
        let client = AvailabilityClient::with_config(&config.client)?;
        Ok(Self::with_client(client, config))
    }

    /// Create a fetcher with a pre-built client
    pub fn with_client(client: AvailabilityClient, config: SourceConfig) -> Self {
        let retry = config.retry.clone();
        Self {
            client,
            config,
            retry,
        }
    }

    /// The source configuration
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Fetch the body for `date`, retrying per policy.
    ///
    /// # Errors
    /// `AvailabilityError::Fetch` once every attempt has failed.
    pub async fn fetch(&self, date: &QueryDate, ids: &str) -> Result<String> {
        self.fetch_with_hook(date, ids, |_| {}).await
    }

    /// Like [`fetch`](Self::fetch), calling `on_retry` before each new attempt.
    pub async fn fetch_with_hook<H>(&self, date: &QueryDate, ids: &str, on_retry: H) -> Result<String>
    where
        H: FnMut(u32),
    {
        let request = build_request(&self.config, date, ids)?;
        let label = format!("{} {}", self.config.name, date);

        let body = self
            .retry
            .run_with_hook(&label, || self.client.send(&request), on_retry)
            .await
            .map_err(|exhausted| AvailabilityError::Fetch {
                date: date.to_string(),
                attempts: exhausted.attempts,
                cause: Box::new(exhausted.last_error),
            })?;

        debug!("{}: received {} bytes", label, body.len());
        Ok(body)
    }
}
