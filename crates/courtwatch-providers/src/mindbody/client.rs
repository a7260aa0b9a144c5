//! Mindbody marketplace gateway client.
//!
//! The availability endpoint takes a POST with JSON-encoded references to
//! the service, location and staff, plus the start-time bounds, and answers
//! with a list of start times and the staff (courts) free at each one.

use chrono::{DateTime, SecondsFormat, Utc};
use courtwatch_core::TimeWindow;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::raw_slot::RawSlot;

use super::config::MindbodyConfig;

/// HTTP client for the availability endpoint.
#[derive(Debug)]
pub struct MindbodyClient {
    http_client: reqwest::Client,
    config: MindbodyConfig,
}

impl MindbodyClient {
    /// Creates a client for the given configuration.
    pub fn new(config: MindbodyConfig) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(format!("courtwatch/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {}", e))
                    .with_source(e)
            })?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &MindbodyConfig {
        &self.config
    }

    /// Returns the underlying HTTP client.
    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http_client
    }

    /// Lists the start times with at least one free court inside `window`.
    pub async fn list_availability(
        &self,
        access_token: &str,
        window: TimeWindow,
    ) -> ProviderResult<Vec<RawSlot>> {
        let response = self
            .http_client
            .post(&self.config.availability_url)
            .bearer_auth(access_token)
            .json(&availability_body(&self.config, window))
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, retry_after, &body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        let slots = parse_availability(&body, &self.config)?;
        debug!(count = slots.len(), "parsed availability response");
        Ok(slots)
    }
}

/// Maps a transport failure to a provider error.
pub(crate) fn request_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::network("request timeout")
    } else if e.is_connect() {
        ProviderError::network(format!("connection failed: {}", e))
    } else {
        ProviderError::network(format!("request failed: {}", e))
    }
}

/// Maps a non-success status of the availability endpoint to an error.
///
/// The gateway answers 400 or 401 once the access token has expired.
pub fn error_for_status(status: StatusCode, retry_after: Option<u64>, body: &str) -> ProviderError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
            ProviderError::session_expired(format!("access token rejected ({})", status))
        }
        StatusCode::FORBIDDEN => ProviderError::authentication("access denied to availability"),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::rate_limited(format!(
            "rate limit exceeded{}",
            retry_after
                .map(|s| format!(", retry after {} seconds", s))
                .unwrap_or_default()
        )),
        _ => ProviderError::server(format!("API error ({}): {}", status, body)),
    }
}

/// Formats an instant the way the gateway expects: milliseconds, `Z` suffix.
fn gateway_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Builds the request body for `window`.
pub fn availability_body(config: &MindbodyConfig, window: TimeWindow) -> Value {
    let service_ref = json!({
        "mb_appointment_type_id": config.appointment_type_id,
        "mb_service_category_id": config.service_category_id,
        "mb_site_id": config.site_id,
        "inventory_source": config.inventory_source,
        "inventory_category": "appointment",
    });
    let location_ref = json!({
        "mb_site_id": config.site_id,
        "mb_location_id": config.location_id,
        "mb_master_location_id": config.master_location_id,
        "inventory_source": config.inventory_source,
    });
    let staff_ref = json!({
        "gateway_id": -1,
        "inventory_source": config.inventory_source,
    });

    json!({
        "appointment_service_ref_json": service_ref.to_string(),
        "inventory_source": config.inventory_source,
        "location_ref_json": location_ref.to_string(),
        "staff_ref_json": staff_ref.to_string(),
        "start_time_from": gateway_timestamp(window.start),
        "start_time_to": gateway_timestamp(window.end),
    })
}

#[derive(Debug, Deserialize)]
struct AvailabilityResponse {
    data: AvailabilityData,
}

#[derive(Debug, Deserialize)]
struct AvailabilityData {
    attributes: AvailabilityAttributes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AvailabilityAttributes {
    start_times: Vec<StartTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartTime {
    start_time: String,
    #[serde(default)]
    staff_ids: Vec<String>,
}

/// Parses an availability response into one record per free court.
///
/// Staff ids look like `"255904:3"`; the number after the colon minus the
/// configured offset is the court. Courts above `max_court` are skipped.
pub fn parse_availability(body: &str, config: &MindbodyConfig) -> ProviderResult<Vec<RawSlot>> {
    let response: AvailabilityResponse = serde_json::from_str(body).map_err(|e| {
        ProviderError::invalid_response(format!("failed to parse response: {}", e))
    })?;

    let mut slots = Vec::new();
    for entry in response.data.attributes.start_times {
        let start = DateTime::parse_from_rfc3339(&entry.start_time)
            .map_err(|e| {
                ProviderError::invalid_response(format!(
                    "invalid start time '{}': {}",
                    entry.start_time, e
                ))
            })?
            .with_timezone(&Utc);

        for staff_id in &entry.staff_ids {
            let court = court_for_staff(staff_id, config)?;
            if court < 1 || config.max_court.is_some_and(|max| court > max) {
                continue;
            }
            slots.push(RawSlot::new(court.to_string(), start));
        }
    }
    Ok(slots)
}

fn court_for_staff(staff_id: &str, config: &MindbodyConfig) -> ProviderResult<i64> {
    let number = staff_id
        .rsplit(':')
        .next()
        .and_then(|n| n.trim().parse::<i64>().ok())
        .ok_or_else(|| {
            ProviderError::invalid_response(format!("invalid staff id '{}'", staff_id))
        })?;
    number.checked_sub(config.court_offset).ok_or_else(|| {
        ProviderError::invalid_response(format!("staff id '{}' is out of range", staff_id))
    })
}
