//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use quillhouse_commerce::email::{Mailer, SmtpError};
use quillhouse_commerce::razorpay::{RazorpayClient, RazorpayError};
use quillhouse_commerce::shiprocket::{ShiprocketClient, ShiprocketError};

use crate::config::AdminConfig;
use crate::error::AppError;

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("razorpay client: {0}")]
    Razorpay(#[from] RazorpayError),
    #[error("shiprocket client: {0}")]
    Shiprocket(#[from] ShiprocketError),
    #[error("smtp relay: {0}")]
    Smtp(#[from] SmtpError),
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    razorpay: RazorpayClient,
    shiprocket: Option<ShiprocketClient>,
    mailer: Mailer,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The Shiprocket client is only built when credentials are configured;
    /// it logs in lazily on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client or the SMTP relay can't be built.
    pub fn new(config: AdminConfig, pool: PgPool) -> Result<Self, StateError> {
        let razorpay = RazorpayClient::new(
            config.razorpay.key_id.clone(),
            config.razorpay.key_secret.clone(),
        )?;

        let shiprocket = config
            .shiprocket()
            .map(|sr| ShiprocketClient::new(sr.email.clone(), sr.password.clone()))
            .transpose()?;
        if shiprocket.is_none() {
            tracing::warn!("Shiprocket not configured - shipment booking disabled");
        }

        let mailer = Mailer::from_config(config.email.as_ref(), &config.storefront_url)?;

        Ok(Self::from_parts(config, pool, razorpay, shiprocket, mailer))
    }

    /// Assemble state from already-built clients.
    #[must_use]
    pub fn from_parts(
        config: AdminConfig,
        pool: PgPool,
        razorpay: RazorpayClient,
        shiprocket: Option<ShiprocketClient>,
        mailer: Mailer,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                razorpay,
                shiprocket,
                mailer,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn razorpay(&self) -> &RazorpayClient {
        &self.inner.razorpay
    }

    /// The Shiprocket client.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unavailable` if Shiprocket is not configured.
    pub fn shiprocket(&self) -> Result<&ShiprocketClient, AppError> {
        self.inner
            .shiprocket
            .as_ref()
            .ok_or_else(|| AppError::Unavailable("Shiprocket is not configured".to_owned()))
    }

    /// Pickup location for new shipments.
    #[must_use]
    pub fn pickup_location(&self) -> &str {
        self.inner
            .config
            .shiprocket()
            .map_or("Primary", |sr| sr.pickup_location.as_str())
    }

    #[must_use]
    pub fn mailer(&self) -> &Mailer {
        &self.inner.mailer
    }
}
