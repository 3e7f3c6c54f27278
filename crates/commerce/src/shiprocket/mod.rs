//! Shiprocket shipping API client.
//!
//! # Architecture
//!
//! - Email/password login returns a bearer token valid for 10 days
//! - The token is cached in memory and renewed after 9 days
//! - Only print lines of an order are shipped; e-books never reach Shiprocket
//!
//! The integration is optional. Without credentials the admin API still
//! manages orders but cannot book shipments.

pub mod auth;
pub mod client;
pub mod types;

pub use auth::ShiprocketToken;
pub use client::ShiprocketClient;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when interacting with the Shiprocket API.
#[derive(Debug, Error)]
pub enum ShiprocketError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Shiprocket rejected the request.
    #[error("Shiprocket error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Login failed (invalid email/password).
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The order has nothing to ship or lacks an address.
    #[error("Not shippable: {0}")]
    NotShippable(String),

    /// AWB assignment did not return a tracking number.
    #[error("AWB assignment failed: {0}")]
    AwbNotAssigned(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shiprocket_error_display() {
        let err = ShiprocketError::NotShippable("order has no print items".to_owned());
        assert_eq!(err.to_string(), "Not shippable: order has no print items");

        let err = ShiprocketError::Api {
            status: 422,
            message: "Invalid pincode".to_owned(),
        };
        assert_eq!(err.to_string(), "Shiprocket error (422): Invalid pincode");
    }
}
