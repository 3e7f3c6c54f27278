//! Razorpay payment gateway client.
//!
//! # Flow
//!
//! 1. The server creates a gateway order for the amount in paise
//!    ([`RazorpayClient::create_order`]) and hands its id plus the public key
//!    id to the browser.
//! 2. The browser runs Razorpay Checkout and posts back
//!    `razorpay_order_id`, `razorpay_payment_id` and `razorpay_signature`.
//! 3. The server checks the signature ([`verify_payment_signature`]) before
//!    treating the order as paid.
//!
//! Refunds go through [`RazorpayClient::refund`].

pub mod client;
pub mod signature;

pub use client::{GatewayOrder, RazorpayClient, Refund};
pub use signature::verify_payment_signature;

use thiserror::Error;

/// Errors that can occur when talking to Razorpay.
#[derive(Debug, Error)]
pub enum RazorpayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Razorpay rejected the request.
    #[error("Razorpay error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The checkout signature does not match.
    #[error("invalid payment signature")]
    InvalidSignature,

    /// The amount cannot be expressed in paise.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_razorpay_error_display() {
        let err = RazorpayError::Api {
            status: 400,
            message: "The amount must be at least INR 1.00".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "Razorpay error (400): The amount must be at least INR 1.00"
        );
        assert_eq!(
            RazorpayError::InvalidSignature.to_string(),
            "invalid payment signature"
        );
    }
}
