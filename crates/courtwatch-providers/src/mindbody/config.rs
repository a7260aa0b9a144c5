//! Mindbody provider configuration.

use std::time::Duration;

use chrono::Duration as SlotDuration;
use serde::{Deserialize, Serialize};
use url::Url;

/// Configuration for the Mindbody provider.
///
/// The defaults target the indoor courts of one club: site 255904,
/// appointment type 44 in service category 8. Staff ids returned by the
/// availability endpoint map to courts as `staff - court_offset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MindbodyConfig {
    /// Availability endpoint of the marketplace gateway.
    pub availability_url: String,

    /// OAuth token endpoint used for password logins.
    pub token_url: String,

    /// OAuth client id for password logins.
    ///
    /// Only needed when logging in with a username and password; a
    /// pre-obtained access token works without it.
    pub client_id: Option<String>,

    /// OAuth scope requested with password logins.
    pub scope: Option<String>,

    /// Mindbody site id.
    pub site_id: i64,

    /// Location id within the site.
    pub location_id: i64,

    /// Marketplace-wide location id.
    pub master_location_id: i64,

    /// Appointment type of a court booking.
    pub appointment_type_id: i64,

    /// Service category of a court booking.
    pub service_category_id: i64,

    /// Inventory source tag sent with every reference.
    pub inventory_source: String,

    /// Subtracted from a staff number to get the court number.
    pub court_offset: i64,

    /// Highest court number to report. Higher numbers are excluded.
    pub max_court: Option<i64>,

    /// Length of one bookable slot in minutes.
    pub slot_minutes: u32,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for MindbodyConfig {
    fn default() -> Self {
        Self {
            availability_url: Self::DEFAULT_AVAILABILITY_URL.to_string(),
            token_url: Self::DEFAULT_TOKEN_URL.to_string(),
            client_id: None,
            scope: None,
            site_id: 255904,
            location_id: 1,
            master_location_id: 2170439,
            appointment_type_id: 44,
            service_category_id: 8,
            inventory_source: "MB".to_string(),
            court_offset: 2,
            max_court: Some(7),
            slot_minutes: 15,
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl MindbodyConfig {
    /// Default availability endpoint.
    pub const DEFAULT_AVAILABILITY_URL: &'static str =
        "https://prod-mkt-gateway.mindbody.io/v1/location/appointment_services/availability";

    /// Default token endpoint.
    pub const DEFAULT_TOKEN_URL: &'static str = "https://signin.mindbodyonline.com/connect/token";

    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Sets the availability endpoint.
    pub fn with_availability_url(mut self, url: impl Into<String>) -> Self {
        self.availability_url = url.into();
        self
    }

    /// Sets the token endpoint.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Sets the OAuth client id.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Sets the court mapping.
    pub fn with_court_mapping(mut self, offset: i64, max_court: Option<i64>) -> Self {
        self.court_offset = offset;
        self.max_court = max_court;
        self
    }

    /// Sets the slot length in minutes.
    pub fn with_slot_minutes(mut self, minutes: u32) -> Self {
        self.slot_minutes = minutes;
        self
    }

    /// Returns the request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns the slot length.
    pub fn slot_length(&self) -> SlotDuration {
        SlotDuration::minutes(i64::from(self.slot_minutes))
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        validate_endpoint("availability_url", &self.availability_url)?;
        validate_endpoint("token_url", &self.token_url)?;

        if self.slot_minutes == 0 {
            return Err("slot_minutes must be greater than zero".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than zero".to_string());
        }
        if let Some(max) = self.max_court
            && max < 1
        {
            return Err("max_court must be at least 1".to_string());
        }
        Ok(())
    }
}

fn validate_endpoint(field: &str, value: &str) -> Result<(), String> {
    let url = Url::parse(value).map_err(|e| format!("invalid {}: {}", field, e))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("invalid {}: unsupported scheme '{}'", field, other)),
    }
}
