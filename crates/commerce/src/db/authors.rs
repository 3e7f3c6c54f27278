//! Author profile repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use quillhouse_core::{AuthorId, UserId, UserRole};

use super::RepositoryError;
use crate::models::catalog::Author;

#[derive(Debug, sqlx::FromRow)]
struct AuthorRow {
    id: i32,
    user_id: i32,
    pen_name: String,
    bio: String,
    website: Option<String>,
    royalty_rate: Decimal,
    created_at: DateTime<Utc>,
}

impl From<AuthorRow> for Author {
    fn from(row: AuthorRow) -> Self {
        Self {
            id: AuthorId::new(row.id),
            user_id: UserId::new(row.user_id),
            pen_name: row.pen_name,
            bio: row.bio,
            website: row.website,
            royalty_rate: row.royalty_rate,
            created_at: row.created_at,
        }
    }
}

/// Repository for author profiles.
pub struct AuthorRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AuthorRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the author profile of a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_user(&self, user_id: UserId) -> Result<Option<Author>, RepositoryError> {
        let row = sqlx::query_as::<_, AuthorRow>(
            r"
            SELECT id, user_id, pen_name, bio, website, royalty_rate, created_at
            FROM shop.author
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Get an author by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: AuthorId) -> Result<Option<Author>, RepositoryError> {
        let row = sqlx::query_as::<_, AuthorRow>(
            r"
            SELECT id, user_id, pen_name, bio, website, royalty_rate, created_at
            FROM shop.author
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Create or update the profile of a user and make sure they hold the
    /// author role. Admins keep their role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_profile(
        &self,
        user_id: UserId,
        pen_name: &str,
        bio: &str,
        website: Option<&str>,
    ) -> Result<Author, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, AuthorRow>(
            r"
            INSERT INTO shop.author (user_id, pen_name, bio, website)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET pen_name = EXCLUDED.pen_name,
                bio = EXCLUDED.bio,
                website = EXCLUDED.website,
                updated_at = NOW()
            RETURNING id, user_id, pen_name, bio, website, royalty_rate, created_at
            ",
        )
        .bind(user_id)
        .bind(pen_name)
        .bind(bio)
        .bind(website)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r"
            UPDATE shop.user
            SET role = $2, updated_at = NOW()
            WHERE id = $1 AND role = $3
            ",
        )
        .bind(user_id)
        .bind(UserRole::Author)
        .bind(UserRole::Customer)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row.into())
    }

    /// Change an author's royalty percentage.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the author doesn't exist.
    pub async fn set_royalty_rate(
        &self,
        id: AuthorId,
        rate: Decimal,
    ) -> Result<Author, RepositoryError> {
        let row = sqlx::query_as::<_, AuthorRow>(
            r"
            UPDATE shop.author
            SET royalty_rate = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, pen_name, bio, website, royalty_rate, created_at
            ",
        )
        .bind(id)
        .bind(rate)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }
}
