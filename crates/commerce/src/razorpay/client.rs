//! Razorpay REST API client.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::instrument;

use quillhouse_core::Money;

use super::RazorpayError;

/// Razorpay API base URL.
const API_BASE: &str = "https://api.razorpay.com/v1";

/// Razorpay REST API client.
///
/// Authenticates every request with HTTP basic auth (key id and key secret).
#[derive(Clone)]
pub struct RazorpayClient {
    inner: Arc<RazorpayClientInner>,
}

struct RazorpayClientInner {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: SecretString,
}

impl std::fmt::Debug for RazorpayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayClient")
            .field("base_url", &self.inner.base_url)
            .field("key_id", &self.inner.key_id)
            .field("key_secret", &"[REDACTED]")
            .finish()
    }
}

/// An order created on the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    /// Amount in paise.
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    pub status: String,
}

/// A refund issued on the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct Refund {
    pub id: String,
    pub payment_id: String,
    /// Amount in paise.
    pub amount: i64,
    /// `pending`, `processed` or `failed`.
    pub status: String,
}

#[derive(Serialize)]
struct CreateOrderRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

#[derive(Serialize)]
struct RefundRequest {
    amount: i64,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

impl RazorpayClient {
    /// Create a client for the live API.
    ///
    /// # Errors
    ///
    /// Returns `RazorpayError::Http` if the HTTP client cannot be built.
    pub fn new(key_id: impl Into<String>, key_secret: SecretString) -> Result<Self, RazorpayError> {
        Self::with_base_url(API_BASE, key_id, key_secret)
    }

    /// Create a client against another base URL (a mock server in tests).
    ///
    /// # Errors
    ///
    /// Returns `RazorpayError::Http` if the HTTP client cannot be built.
    pub fn with_base_url(
        base_url: impl Into<String>,
        key_id: impl Into<String>,
        key_secret: SecretString,
    ) -> Result<Self, RazorpayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            inner: Arc::new(RazorpayClientInner {
                client,
                base_url: base_url.into().trim_end_matches('/').to_owned(),
                key_id: key_id.into(),
                key_secret,
            }),
        })
    }

    /// Public key id, passed to Razorpay Checkout in the browser.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.inner.key_id
    }

    /// Check a checkout callback signature against this client's secret.
    ///
    /// # Errors
    ///
    /// Returns `RazorpayError::InvalidSignature` if it does not match.
    pub fn verify_payment_signature(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<(), RazorpayError> {
        super::verify_payment_signature(&self.inner.key_secret, order_id, payment_id, signature)
    }

    /// Create a gateway order for `amount`.
    ///
    /// # Errors
    ///
    /// Returns `RazorpayError::InvalidAmount` for non-positive amounts,
    /// `RazorpayError::Api` if Razorpay rejects the order.
    #[instrument(skip(self), fields(amount = %amount))]
    pub async fn create_order(&self, amount: Money, receipt: &str) -> Result<GatewayOrder, RazorpayError> {
        let paise = to_paise(amount)?;

        let order: GatewayOrder = self
            .post(
                "/orders",
                &CreateOrderRequest {
                    amount: paise,
                    currency: amount.currency.code(),
                    receipt,
                },
            )
            .await?;

        tracing::info!(gateway_order_id = %order.id, paise, "Razorpay order created");
        Ok(order)
    }

    /// Refund `amount` of a captured payment.
    ///
    /// # Errors
    ///
    /// Returns `RazorpayError::InvalidAmount` for non-positive amounts,
    /// `RazorpayError::Api` if Razorpay rejects the refund.
    #[instrument(skip(self), fields(amount = %amount))]
    pub async fn refund(&self, payment_id: &str, amount: Money) -> Result<Refund, RazorpayError> {
        let paise = to_paise(amount)?;

        let refund: Refund = self
            .post(
                &format!("/payments/{payment_id}/refund"),
                &RefundRequest { amount: paise },
            )
            .await?;

        tracing::info!(refund_id = %refund.id, status = %refund.status, "Razorpay refund issued");
        Ok(refund)
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, RazorpayError> {
        let response = self
            .inner
            .client
            .post(format!("{}{path}", self.inner.base_url))
            .basic_auth(&self.inner.key_id, Some(self.inner.key_secret.expose_secret()))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .ok()
                .and_then(|envelope| envelope.error.description.or(envelope.error.code))
                .unwrap_or(text);
            return Err(RazorpayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}

fn to_paise(amount: Money) -> Result<i64, RazorpayError> {
    match amount.to_minor_units() {
        Some(paise) if paise > 0 => Ok(paise),
        _ => Err(RazorpayError::InvalidAmount(amount.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_to_paise() {
        assert_eq!(to_paise(Money::inr(Decimal::new(49950, 2))).ok(), Some(49950));
        assert!(to_paise(Money::zero()).is_err());
        assert!(to_paise(Money::inr(Decimal::new(-1, 0))).is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let client = RazorpayClient::new("rzp_test_key", SecretString::from("super-secret"))
            .expect("client");
        let debug = format!("{client:?}");
        assert!(debug.contains("rzp_test_key"));
        assert!(!debug.contains("super-secret"));
    }
}
