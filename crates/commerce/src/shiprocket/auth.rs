//! Shiprocket authentication.
//!
//! Handles email/password login to obtain bearer tokens for API access.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::ShiprocketError;

/// Tokens are valid for 10 days; renew a day early.
const TOKEN_REFRESH_AFTER_DAYS: i64 = 9;

/// Bearer token obtained from Shiprocket login.
#[derive(Debug, Clone)]
pub struct ShiprocketToken {
    pub token: SecretString,
    pub issued_at: DateTime<Utc>,
}

impl ShiprocketToken {
    #[must_use]
    pub fn new(token: SecretString, issued_at: DateTime<Utc>) -> Self {
        Self { token, issued_at }
    }

    /// Whether the token should be replaced before use at `now`.
    #[must_use]
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now - self.issued_at >= Duration::days(TOKEN_REFRESH_AFTER_DAYS)
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Deserialize)]
struct LoginErrorResponse {
    #[serde(default)]
    message: Option<String>,
}

/// Log in with the API user's email and password.
///
/// # Errors
///
/// Returns `ShiprocketError::AuthenticationFailed` if the credentials are rejected.
#[instrument(skip(client, password), fields(email = %email))]
pub async fn login(
    client: &reqwest::Client,
    base_url: &str,
    email: &str,
    password: &SecretString,
) -> Result<ShiprocketToken, ShiprocketError> {
    let response = client
        .post(format!("{base_url}/auth/login"))
        .json(&LoginRequest {
            email,
            password: password.expose_secret(),
        })
        .send()
        .await?;

    let status = response.status();

    if status.is_success() {
        let login: LoginResponse = response.json().await?;
        tracing::info!("Shiprocket token obtained");
        return Ok(ShiprocketToken::new(SecretString::from(login.token), Utc::now()));
    }

    let message = response
        .json::<LoginErrorResponse>()
        .await
        .ok()
        .and_then(|body| body.message)
        .unwrap_or_else(|| format!("HTTP {status}"));

    Err(ShiprocketError::AuthenticationFailed(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_refresh_window() {
        let issued = Utc::now();
        let token = ShiprocketToken::new(SecretString::from("t"), issued);

        assert!(!token.needs_refresh(issued));
        assert!(!token.needs_refresh(issued + Duration::days(8)));
        assert!(token.needs_refresh(issued + Duration::days(9)));
        assert!(token.needs_refresh(issued + Duration::days(12)));
    }
}
