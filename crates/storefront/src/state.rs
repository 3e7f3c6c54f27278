//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use quillhouse_commerce::email::{Mailer, SmtpError};
use quillhouse_commerce::razorpay::{RazorpayClient, RazorpayError};

use crate::config::StorefrontConfig;
use crate::services::Catalog;

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("razorpay client: {0}")]
    Razorpay(#[from] RazorpayError),
    #[error("smtp relay: {0}")]
    Smtp(#[from] SmtpError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    razorpay: RazorpayClient,
    mailer: Mailer,
    catalog: Catalog,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the Razorpay client or SMTP relay can't be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let razorpay = RazorpayClient::new(
            config.razorpay.key_id.clone(),
            config.razorpay.key_secret.clone(),
        )?;
        let mailer = Mailer::from_config(config.email.as_ref(), &config.base_url)?;

        Ok(Self::from_parts(config, pool, razorpay, mailer))
    }

    /// Assemble state from already-built clients.
    #[must_use]
    pub fn from_parts(
        config: StorefrontConfig,
        pool: PgPool,
        razorpay: RazorpayClient,
        mailer: Mailer,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                razorpay,
                mailer,
                catalog: Catalog::new(),
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn razorpay(&self) -> &RazorpayClient {
        &self.inner.razorpay
    }

    #[must_use]
    pub fn mailer(&self) -> &Mailer {
        &self.inner.mailer
    }

    /// Cached view of the published catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }
}
