//! Password login against the Mindbody identity server.

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

use super::client::{MindbodyClient, request_error};

/// Token endpoint response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    /// Bearer token for the gateway.
    pub access_token: String,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Exchanges a username and password for an access token.
///
/// Returns the token and its reported lifetime in seconds.
pub async fn password_grant(
    client: &MindbodyClient,
    username: &str,
    password: &str,
) -> ProviderResult<TokenResponse> {
    let config = client.config();
    let client_id = config.client_id.as_deref().ok_or_else(|| {
        ProviderError::configuration("mindbody.client_id is required for password login")
    })?;

    let mut params = vec![
        ("grant_type", "password"),
        ("client_id", client_id),
        ("username", username),
        ("password", password),
    ];
    if let Some(ref scope) = config.scope {
        params.push(("scope", scope.as_str()));
    }

    debug!(token_url = %config.token_url, "requesting access token");
    let response = client
        .http()
        .post(&config.token_url)
        .form(&params)
        .send()
        .await
        .map_err(request_error)?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

    if !status.is_success() {
        return Err(token_error(status, &body));
    }

    let token = parse_token_response(&body)?;
    info!(expires_in = ?token.expires_in, "obtained access token");
    Ok(token)
}

/// Maps a non-success token endpoint status to an error.
fn token_error(status: StatusCode, body: &str) -> ProviderError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::rate_limited("token endpoint rate limited"),
        s if s.is_server_error() => {
            ProviderError::server(format!("token endpoint error ({}): {}", status, body))
        }
        _ => ProviderError::authentication(format!("login rejected ({}): {}", status, body)),
    }
}

fn parse_token_response(body: &str) -> ProviderResult<TokenResponse> {
    let token: TokenResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::invalid_response(format!("invalid token response: {}", e)))?;
    if token.access_token.is_empty() {
        return Err(ProviderError::invalid_response("token response has an empty access_token"));
    }
    if let Some(secs) = token.expires_in
        && secs < 0
    {
        return Err(ProviderError::invalid_response(format!(
            "token response has a negative expires_in: {}",
            secs
        )));
    }
    Ok(token)
}
