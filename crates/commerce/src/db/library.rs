//! E-book library repository.
//!
//! Purchased e-books are granted when an order's payment is captured (see
//! [`super::OrderRepository::capture_payment`]). An active subscription
//! unlocks every published e-book without a library row.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use quillhouse_core::{BookId, BookStatus, LibrarySource, SubscriptionStatus, UserId};

use super::RepositoryError;
use crate::models::subscription::LibraryEntry;

#[derive(Debug, sqlx::FromRow)]
struct LibraryRow {
    book_id: i32,
    title: String,
    author_name: String,
    cover_url: Option<String>,
    source: LibrarySource,
    granted_at: DateTime<Utc>,
}

impl From<LibraryRow> for LibraryEntry {
    fn from(row: LibraryRow) -> Self {
        Self {
            book_id: BookId::new(row.book_id),
            title: row.title,
            author_name: row.author_name,
            cover_url: row.cover_url,
            source: row.source,
            granted_at: row.granted_at,
        }
    }
}

/// Repository for the e-book library.
pub struct LibraryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> LibraryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// E-books the user owns, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<LibraryEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, LibraryRow>(
            r"
            SELECT l.book_id, b.title, a.pen_name AS author_name, b.cover_url, l.source,
                   l.granted_at
            FROM shop.library_entry l
            JOIN shop.book b ON b.id = l.book_id
            JOIN shop.author a ON a.id = b.author_id
            WHERE l.user_id = $1
            ORDER BY l.granted_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Whether the user may read a book: they own it, or they hold an
    /// active subscription and the book is a published e-book.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn has_access(&self, user_id: UserId, book_id: BookId) -> Result<bool, RepositoryError> {
        let access: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS (
                SELECT 1 FROM shop.library_entry WHERE user_id = $1 AND book_id = $2
            ) OR (
                EXISTS (
                    SELECT 1 FROM shop.subscription
                    WHERE user_id = $1 AND status = $3 AND ends_at > NOW()
                )
                AND EXISTS (
                    SELECT 1 FROM shop.book
                    WHERE id = $2 AND status = $4 AND ebook_url IS NOT NULL
                )
            )
            ",
        )
        .bind(user_id)
        .bind(book_id)
        .bind(SubscriptionStatus::Active)
        .bind(BookStatus::Published)
        .fetch_one(self.pool)
        .await?;

        Ok(access)
    }
}
