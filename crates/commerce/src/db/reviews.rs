//! Review repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use quillhouse_core::{BookId, ReviewId, UserId};

use super::RepositoryError;
use crate::models::catalog::Review;

#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: i32,
    book_id: i32,
    user_id: i32,
    reviewer: String,
    rating: i16,
    comment: String,
    created_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: ReviewId::new(row.id),
            book_id: BookId::new(row.book_id),
            user_id: UserId::new(row.user_id),
            reviewer: row.reviewer,
            rating: row.rating,
            comment: row.comment,
            created_at: row.created_at,
        }
    }
}

/// Average rating and number of reviews for a book.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RatingSummary {
    pub average: Option<Decimal>,
    pub count: i64,
}

/// Repository for reviews.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Reviews of a book, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_book(&self, book_id: BookId) -> Result<Vec<Review>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            r"
            SELECT r.id, r.book_id, r.user_id,
                   COALESCE(u.display_name, 'Reader') AS reviewer,
                   r.rating, r.comment, r.created_at
            FROM shop.review r
            JOIN shop.user u ON u.id = r.user_id
            WHERE r.book_id = $1
            ORDER BY r.created_at DESC
            ",
        )
        .bind(book_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Rating summary of a book.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn summary(&self, book_id: BookId) -> Result<RatingSummary, RepositoryError> {
        let summary = sqlx::query_as::<_, RatingSummary>(
            r"
            SELECT ROUND(AVG(rating)::NUMERIC, 1) AS average, COUNT(*) AS count
            FROM shop.review
            WHERE book_id = $1
            ",
        )
        .bind(book_id)
        .fetch_one(self.pool)
        .await?;

        Ok(summary)
    }

    /// Add a review. One review per user per book.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already reviewed the book.
    pub async fn create(
        &self,
        book_id: BookId,
        user_id: UserId,
        rating: i16,
        comment: &str,
    ) -> Result<Review, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            r"
            WITH inserted AS (
                INSERT INTO shop.review (book_id, user_id, rating, comment)
                VALUES ($1, $2, $3, $4)
                RETURNING id, book_id, user_id, rating, comment, created_at
            )
            SELECT i.id, i.book_id, i.user_id,
                   COALESCE(u.display_name, 'Reader') AS reviewer,
                   i.rating, i.comment, i.created_at
            FROM inserted i
            JOIN shop.user u ON u.id = i.user_id
            ",
        )
        .bind(book_id)
        .bind(user_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_unique(e, "you have already reviewed this book"))?;

        Ok(row.into())
    }

    /// Delete a review (moderation).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review doesn't exist.
    pub async fn delete(&self, id: ReviewId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.review WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
