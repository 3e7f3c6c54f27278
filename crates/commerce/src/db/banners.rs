//! Hero banner repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use quillhouse_core::BannerId;

use super::RepositoryError;
use crate::models::marketing::{Banner, BannerInput};

const BANNER_COLUMNS: &str =
    "id, title, subtitle, image_url, link_url, position, active, starts_at, ends_at";

#[derive(Debug, sqlx::FromRow)]
struct BannerRow {
    id: i32,
    title: String,
    subtitle: Option<String>,
    image_url: String,
    link_url: Option<String>,
    position: i32,
    active: bool,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
}

impl From<BannerRow> for Banner {
    fn from(row: BannerRow) -> Self {
        Self {
            id: BannerId::new(row.id),
            title: row.title,
            subtitle: row.subtitle,
            image_url: row.image_url,
            link_url: row.link_url,
            position: row.position,
            active: row.active,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
        }
    }
}

/// Repository for hero banners.
pub struct BannerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BannerRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Banners that are active and inside their display window.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_live(&self) -> Result<Vec<Banner>, RepositoryError> {
        let rows = sqlx::query_as::<_, BannerRow>(&format!(
            r"
            SELECT {BANNER_COLUMNS}
            FROM shop.hero_banner
            WHERE active
              AND (starts_at IS NULL OR starts_at <= NOW())
              AND (ends_at IS NULL OR ends_at > NOW())
            ORDER BY position, id
            "
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// All banners.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Banner>, RepositoryError> {
        let rows = sqlx::query_as::<_, BannerRow>(&format!(
            "SELECT {BANNER_COLUMNS} FROM shop.hero_banner ORDER BY position, id"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Create a banner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, input: &BannerInput) -> Result<Banner, RepositoryError> {
        let row = sqlx::query_as::<_, BannerRow>(&format!(
            r"
            INSERT INTO shop.hero_banner
                (title, subtitle, image_url, link_url, position, active, starts_at, ends_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {BANNER_COLUMNS}
            "
        ))
        .bind(&input.title)
        .bind(input.subtitle.as_deref())
        .bind(&input.image_url)
        .bind(input.link_url.as_deref())
        .bind(input.position)
        .bind(input.active)
        .bind(input.starts_at)
        .bind(input.ends_at)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Replace a banner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the banner doesn't exist.
    pub async fn update(&self, id: BannerId, input: &BannerInput) -> Result<Banner, RepositoryError> {
        let row = sqlx::query_as::<_, BannerRow>(&format!(
            r"
            UPDATE shop.hero_banner
            SET title = $2, subtitle = $3, image_url = $4, link_url = $5, position = $6,
                active = $7, starts_at = $8, ends_at = $9
            WHERE id = $1
            RETURNING {BANNER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&input.title)
        .bind(input.subtitle.as_deref())
        .bind(&input.image_url)
        .bind(input.link_url.as_deref())
        .bind(input.position)
        .bind(input.active)
        .bind(input.starts_at)
        .bind(input.ends_at)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Delete a banner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the banner doesn't exist.
    pub async fn delete(&self, id: BannerId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.hero_banner WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
