//! Announcement repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use quillhouse_core::UpdateId;

use super::RepositoryError;
use crate::models::content::{Update, UpdateInput};

#[derive(Debug, sqlx::FromRow)]
struct UpdateRow {
    id: i32,
    title: String,
    body: String,
    published: bool,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<UpdateRow> for Update {
    fn from(row: UpdateRow) -> Self {
        Self {
            id: UpdateId::new(row.id),
            title: row.title,
            body: row.body,
            published: row.published,
            published_at: row.published_at,
            created_at: row.created_at,
        }
    }
}

/// Repository for announcements.
pub struct UpdateRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UpdateRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Announcements, most recent first. `published_only` hides drafts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, published_only: bool) -> Result<Vec<Update>, RepositoryError> {
        let rows = sqlx::query_as::<_, UpdateRow>(
            r"
            SELECT id, title, body, published, published_at, created_at
            FROM shop.update
            WHERE published OR NOT $1
            ORDER BY COALESCE(published_at, created_at) DESC
            ",
        )
        .bind(published_only)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Create an announcement.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, input: &UpdateInput) -> Result<Update, RepositoryError> {
        let row = sqlx::query_as::<_, UpdateRow>(
            r"
            INSERT INTO shop.update (title, body, published, published_at)
            VALUES ($1, $2, $3, CASE WHEN $3 THEN NOW() END)
            RETURNING id, title, body, published, published_at, created_at
            ",
        )
        .bind(&input.title)
        .bind(&input.body)
        .bind(input.published)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Replace an announcement. `published_at` is set the first time it is
    /// published.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the announcement doesn't exist.
    pub async fn update(&self, id: UpdateId, input: &UpdateInput) -> Result<Update, RepositoryError> {
        let row = sqlx::query_as::<_, UpdateRow>(
            r"
            UPDATE shop.update
            SET title = $2, body = $3, published = $4,
                published_at = CASE WHEN $4 THEN COALESCE(published_at, NOW()) ELSE published_at END
            WHERE id = $1
            RETURNING id, title, body, published, published_at, created_at
            ",
        )
        .bind(id)
        .bind(&input.title)
        .bind(&input.body)
        .bind(input.published)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Delete an announcement.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the announcement doesn't exist.
    pub async fn delete(&self, id: UpdateId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.update WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
