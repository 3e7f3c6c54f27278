//! Shiprocket REST API client.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use tracing::instrument;

use super::auth::{ShiprocketToken, login};
use super::types::{
    AdhocOrder, AwbAssignment, AwbResponse, CreatedShipment, Tracking, TrackingResponse,
};
use super::ShiprocketError;

/// Shiprocket external API base URL.
const API_BASE: &str = "https://apiv2.shiprocket.in/v1/external";

/// Shiprocket REST API client.
///
/// Logs in on first use and keeps the token in memory until it is due for
/// renewal. A `401` drops the cached token so the next call logs in again.
#[derive(Clone)]
pub struct ShiprocketClient {
    inner: Arc<ShiprocketClientInner>,
}

struct ShiprocketClientInner {
    client: reqwest::Client,
    base_url: String,
    email: String,
    password: SecretString,
    /// In-memory token cache
    token: RwLock<Option<ShiprocketToken>>,
}

impl std::fmt::Debug for ShiprocketClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShiprocketClient")
            .field("base_url", &self.inner.base_url)
            .field("email", &self.inner.email)
            .field("password", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct AssignAwbRequest {
    shipment_id: i64,
}

#[derive(Serialize)]
struct CancelRequest<'a> {
    ids: &'a [i64],
}

impl ShiprocketClient {
    /// Create a client for the live API.
    ///
    /// # Errors
    ///
    /// Returns `ShiprocketError::Http` if the HTTP client cannot be built.
    pub fn new(email: impl Into<String>, password: SecretString) -> Result<Self, ShiprocketError> {
        Self::with_base_url(API_BASE, email, password)
    }

    /// Create a client against another base URL (a mock server in tests).
    ///
    /// # Errors
    ///
    /// Returns `ShiprocketError::Http` if the HTTP client cannot be built.
    pub fn with_base_url(
        base_url: impl Into<String>,
        email: impl Into<String>,
        password: SecretString,
    ) -> Result<Self, ShiprocketError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            inner: Arc::new(ShiprocketClientInner {
                client,
                base_url: base_url.into().trim_end_matches('/').to_owned(),
                email: email.into(),
                password,
                token: RwLock::new(None),
            }),
        })
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Check if a usable token is cached.
    pub async fn has_valid_token(&self) -> bool {
        self.inner
            .token
            .read()
            .await
            .as_ref()
            .is_some_and(|token| !token.needs_refresh(Utc::now()))
    }

    /// Clear the cached token.
    pub async fn clear_token(&self) {
        *self.inner.token.write().await = None;
    }

    /// Cached token, logging in first when missing or stale.
    async fn access_token(&self) -> Result<String, ShiprocketError> {
        if let Some(token) = self.inner.token.read().await.as_ref()
            && !token.needs_refresh(Utc::now())
        {
            return Ok(token.token.expose_secret().to_owned());
        }

        let mut cached = self.inner.token.write().await;

        // Another task may have logged in while we waited for the lock
        if let Some(token) = cached.as_ref()
            && !token.needs_refresh(Utc::now())
        {
            return Ok(token.token.expose_secret().to_owned());
        }

        let token = login(
            &self.inner.client,
            &self.inner.base_url,
            &self.inner.email,
            &self.inner.password,
        )
        .await?;
        let access = token.token.expose_secret().to_owned();
        *cached = Some(token);

        Ok(access)
    }

    // =========================================================================
    // Shipments
    // =========================================================================

    /// Book a shipment for an order.
    ///
    /// # Errors
    ///
    /// Returns `ShiprocketError::Api` if Shiprocket rejects the order.
    #[instrument(skip(self, order), fields(order_id = %order.order_id))]
    pub async fn create_order(&self, order: &AdhocOrder) -> Result<CreatedShipment, ShiprocketError> {
        let created: CreatedShipment = self
            .send(reqwest::Method::POST, "/orders/create/adhoc", Some(order))
            .await?;

        tracing::info!(
            shiprocket_order_id = created.order_id,
            shipment_id = created.shipment_id,
            "Shiprocket order created"
        );
        Ok(created)
    }

    /// Assign a courier and tracking number to a shipment.
    ///
    /// # Errors
    ///
    /// Returns `ShiprocketError::AwbNotAssigned` if no courier accepted it.
    #[instrument(skip(self))]
    pub async fn assign_awb(&self, shipment_id: i64) -> Result<AwbAssignment, ShiprocketError> {
        let response: AwbResponse = self
            .send(
                reqwest::Method::POST,
                "/courier/assign/awb",
                Some(&AssignAwbRequest { shipment_id }),
            )
            .await?;

        match response.response {
            Some(body) if response.awb_assign_status == 1 && !body.data.awb_code.is_empty() => {
                tracing::info!(awb = %body.data.awb_code, courier = %body.data.courier_name, "AWB assigned");
                Ok(body.data)
            }
            _ => Err(ShiprocketError::AwbNotAssigned(
                response
                    .message
                    .unwrap_or_else(|| "no courier available".to_owned()),
            )),
        }
    }

    /// Tracking history for an AWB.
    ///
    /// # Errors
    ///
    /// Returns `ShiprocketError::Api` if the AWB is unknown.
    #[instrument(skip(self))]
    pub async fn track_awb(&self, awb_code: &str) -> Result<Tracking, ShiprocketError> {
        let response: TrackingResponse = self
            .send::<(), _>(
                reqwest::Method::GET,
                &format!("/courier/track/awb/{awb_code}"),
                None,
            )
            .await?;

        let data = response.tracking_data;
        if let Some(error) = data.error
            && !error.is_empty()
        {
            return Err(ShiprocketError::Api {
                status: 404,
                message: error,
            });
        }

        Ok(Tracking {
            awb_code: awb_code.to_owned(),
            current_status: data
                .shipment_track
                .into_iter()
                .find_map(|track| track.current_status),
            track_url: data.track_url,
            activities: data.shipment_track_activities.unwrap_or_default(),
        })
    }

    /// Cancel Shiprocket orders.
    ///
    /// # Errors
    ///
    /// Returns `ShiprocketError::Api` if Shiprocket refuses the cancellation.
    #[instrument(skip(self))]
    pub async fn cancel_orders(&self, shiprocket_order_ids: &[i64]) -> Result<(), ShiprocketError> {
        let _: serde_json::Value = self
            .send(
                reqwest::Method::POST,
                "/orders/cancel",
                Some(&CancelRequest {
                    ids: shiprocket_order_ids,
                }),
            )
            .await?;

        tracing::info!(?shiprocket_order_ids, "Shiprocket orders cancelled");
        Ok(())
    }

    async fn send<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ShiprocketError> {
        let access_token = self.access_token().await?;

        let mut request = self
            .inner
            .client
            .request(method, format!("{}{path}", self.inner.base_url))
            .bearer_auth(access_token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.clear_token().await;
        }

        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|value| value.get("message").and_then(|m| m.as_str()).map(str::to_owned))
                .unwrap_or(text);
            return Err(ShiprocketError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}
