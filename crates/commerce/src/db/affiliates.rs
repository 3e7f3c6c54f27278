//! Affiliate link repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use quillhouse_core::{AffiliateLinkId, AuthorId, BookId, PaymentStatus};

use super::RepositoryError;
use crate::models::marketing::AffiliateLink;

#[derive(Debug, sqlx::FromRow)]
struct AffiliateRow {
    id: i32,
    author_id: i32,
    book_id: Option<i32>,
    code: String,
    clicks: i64,
    orders: i64,
    created_at: DateTime<Utc>,
}

impl From<AffiliateRow> for AffiliateLink {
    fn from(row: AffiliateRow) -> Self {
        Self {
            id: AffiliateLinkId::new(row.id),
            author_id: AuthorId::new(row.author_id),
            book_id: row.book_id.map(BookId::new),
            code: row.code,
            clicks: row.clicks,
            orders: row.orders,
            created_at: row.created_at,
        }
    }
}

/// Repository for affiliate links.
pub struct AffiliateRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AffiliateRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// An author's links with click and paid-order counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_author(
        &self,
        author_id: AuthorId,
    ) -> Result<Vec<AffiliateLink>, RepositoryError> {
        let rows = sqlx::query_as::<_, AffiliateRow>(
            r"
            SELECT l.id, l.author_id, l.book_id, l.code, l.clicks, l.created_at,
                   (SELECT COUNT(*) FROM shop.order o
                    WHERE o.affiliate_code = l.code AND o.payment_status = $2) AS orders
            FROM shop.affiliate_link l
            WHERE l.author_id = $1
            ORDER BY l.created_at DESC
            ",
        )
        .bind(author_id)
        .bind(PaymentStatus::Paid)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Create a link.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is taken.
    pub async fn create(
        &self,
        author_id: AuthorId,
        book_id: Option<BookId>,
        code: &str,
    ) -> Result<AffiliateLink, RepositoryError> {
        let row = sqlx::query_as::<_, AffiliateRow>(
            r"
            INSERT INTO shop.affiliate_link (author_id, book_id, code)
            VALUES ($1, $2, $3)
            RETURNING id, author_id, book_id, code, clicks, 0::BIGINT AS orders, created_at
            ",
        )
        .bind(author_id)
        .bind(book_id)
        .bind(code)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_unique(e, "affiliate code already exists"))?;

        Ok(row.into())
    }

    /// Count a click and return the link, or `None` for an unknown code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn record_click(&self, code: &str) -> Result<Option<AffiliateLink>, RepositoryError> {
        let row = sqlx::query_as::<_, AffiliateRow>(
            r"
            UPDATE shop.affiliate_link
            SET clicks = clicks + 1
            WHERE code = $1
            RETURNING id, author_id, book_id, code, clicks, 0::BIGINT AS orders, created_at
            ",
        )
        .bind(code)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Whether a code belongs to an existing link.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, code: &str) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM shop.affiliate_link WHERE code = $1)",
        )
        .bind(code)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }
}
