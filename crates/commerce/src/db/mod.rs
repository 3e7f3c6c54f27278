//! Database operations for the shared `PostgreSQL` database.
//!
//! # Schema: `shop`
//!
//! ## Tables
//!
//! - `user`, `user_password` - Accounts and password hashes
//! - `author` - Publishing profiles
//! - `book`, `review`, `library_entry` - Catalog and e-book access
//! - `order`, `order_item`, `transaction` - Orders and the payment ledger
//! - `coupon`, `affiliate_link` - Discounts and referral tracking
//! - `subscription_plan`, `subscription` - E-book subscriptions
//! - `hero_banner`, `update`, `job`, `job_application` - Site content
//!
//! Session data lives in `tower_sessions.session`.
//!
//! # Migrations
//!
//! Migrations are stored in `migrations/` at the workspace root and run via:
//! ```bash
//! cargo run -p quillhouse-cli -- migrate
//! ```

pub mod affiliates;
pub mod authors;
pub mod banners;
pub mod books;
pub mod coupons;
pub mod jobs;
pub mod library;
pub mod orders;
pub mod reviews;
pub mod sales;
pub mod subscriptions;
pub mod transactions;
pub mod updates;
pub mod users;

use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use quillhouse_core::Money;

pub use affiliates::AffiliateRepository;
pub use authors::AuthorRepository;
pub use banners::BannerRepository;
pub use books::BookRepository;
pub use coupons::CouponRepository;
pub use jobs::JobRepository;
pub use library::LibraryRepository;
pub use orders::OrderRepository;
pub use reviews::ReviewRepository;
pub use sales::SalesRepository;
pub use subscriptions::SubscriptionRepository;
pub use transactions::TransactionRepository;
pub use updates::UpdateRepository;
pub use users::UserRepository;

/// Rows per page for paginated listings.
pub const PAGE_SIZE: i64 = 24;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique violation to `Conflict`, anything else to `Database`.
    pub(crate) fn conflict_on_unique(e: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Offset for a 1-based page number.
pub(crate) fn page_offset(page: Option<u32>) -> i64 {
    i64::from(page.unwrap_or(1).max(1) - 1) * PAGE_SIZE
}

/// Rupee amount from a `NUMERIC` column.
pub(crate) fn inr(amount: Decimal) -> Money {
    Money::inr(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_offset() {
        assert_eq!(page_offset(None), 0);
        assert_eq!(page_offset(Some(0)), 0);
        assert_eq!(page_offset(Some(1)), 0);
        assert_eq!(page_offset(Some(3)), 2 * PAGE_SIZE);
    }
}
