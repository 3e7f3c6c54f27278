//! Coupon repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use quillhouse_core::coupon::CouponRules;
use quillhouse_core::{AffiliateLinkId, CouponId, DiscountKind, UserId};

use super::RepositoryError;
use crate::models::marketing::{Coupon, CouponInput};

const COUPON_COLUMNS: &str = r"
    id, code, description, discount_kind, discount_value, max_discount, min_order_value,
    usage_limit, usage_count, per_user_limit, starts_at, expires_at, active,
    affiliate_link_id, created_at
";

#[derive(Debug, sqlx::FromRow)]
struct CouponRow {
    id: i32,
    code: String,
    description: String,
    discount_kind: DiscountKind,
    discount_value: Decimal,
    max_discount: Option<Decimal>,
    min_order_value: Option<Decimal>,
    usage_limit: Option<i32>,
    usage_count: i32,
    per_user_limit: Option<i32>,
    starts_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    active: bool,
    affiliate_link_id: Option<i32>,
    created_at: DateTime<Utc>,
}

impl From<CouponRow> for Coupon {
    fn from(row: CouponRow) -> Self {
        Self {
            id: CouponId::new(row.id),
            description: row.description,
            affiliate_link_id: row.affiliate_link_id.map(AffiliateLinkId::new),
            rules: CouponRules {
                code: row.code,
                kind: row.discount_kind,
                value: row.discount_value,
                max_discount: row.max_discount,
                min_order_value: row.min_order_value,
                usage_limit: row.usage_limit,
                usage_count: row.usage_count,
                per_user_limit: row.per_user_limit,
                starts_at: row.starts_at,
                expires_at: row.expires_at,
                active: row.active,
            },
            created_at: row.created_at,
        }
    }
}

/// Lock a coupon row for a redemption and count the buyer's earlier uses.
///
/// The row stays locked until the surrounding transaction ends, so two
/// captures on the same coupon see each other's usage.
pub(super) async fn lock_for_redemption(
    conn: &mut PgConnection,
    code: &str,
    user_id: UserId,
) -> Result<Option<(CouponRules, i64)>, RepositoryError> {
    let row = sqlx::query_as::<_, CouponRow>(&format!(
        "SELECT {COUPON_COLUMNS} FROM shop.coupon WHERE code = $1 FOR UPDATE"
    ))
    .bind(code)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let uses: i64 = sqlx::query_scalar(
        r"
        SELECT COUNT(*)
        FROM shop.order
        WHERE coupon_code = $1 AND user_id = $2 AND placed_at IS NOT NULL
        ",
    )
    .bind(code)
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(Some((Coupon::from(row).rules, uses)))
}

/// Repository for coupons.
pub struct CouponRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CouponRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Look up a coupon by its normalized code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_code(&self, code: &str) -> Result<Option<Coupon>, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {COUPON_COLUMNS} FROM shop.coupon WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// All coupons, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Coupon>, RepositoryError> {
        let rows = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {COUPON_COLUMNS} FROM shop.coupon ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// How many orders this user placed with the code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn uses_by_user(&self, code: &str, user_id: UserId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*)
            FROM shop.order
            WHERE coupon_code = $1 AND user_id = $2 AND placed_at IS NOT NULL
            ",
        )
        .bind(code)
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }

    /// Create a coupon. `code` must already be normalized.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is taken.
    pub async fn create(&self, code: &str, input: &CouponInput) -> Result<Coupon, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            r"
            INSERT INTO shop.coupon (
                code, description, discount_kind, discount_value, max_discount,
                min_order_value, usage_limit, per_user_limit, starts_at, expires_at,
                active, affiliate_link_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {COUPON_COLUMNS}
            "
        ))
        .bind(code)
        .bind(&input.description)
        .bind(input.kind)
        .bind(input.value)
        .bind(input.max_discount)
        .bind(input.min_order_value)
        .bind(input.usage_limit)
        .bind(input.per_user_limit)
        .bind(input.starts_at)
        .bind(input.expires_at)
        .bind(input.active)
        .bind(input.affiliate_link_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_unique(e, "coupon code already exists"))?;

        Ok(row.into())
    }

    /// Replace a coupon's rules. The usage count is kept.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the coupon doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new code is taken.
    pub async fn update(
        &self,
        id: CouponId,
        code: &str,
        input: &CouponInput,
    ) -> Result<Coupon, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            r"
            UPDATE shop.coupon
            SET code = $2, description = $3, discount_kind = $4, discount_value = $5,
                max_discount = $6, min_order_value = $7, usage_limit = $8,
                per_user_limit = $9, starts_at = $10, expires_at = $11, active = $12,
                affiliate_link_id = $13, updated_at = NOW()
            WHERE id = $1
            RETURNING {COUPON_COLUMNS}
            "
        ))
        .bind(id)
        .bind(code)
        .bind(&input.description)
        .bind(input.kind)
        .bind(input.value)
        .bind(input.max_discount)
        .bind(input.min_order_value)
        .bind(input.usage_limit)
        .bind(input.per_user_limit)
        .bind(input.starts_at)
        .bind(input.expires_at)
        .bind(input.active)
        .bind(input.affiliate_link_id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_unique(e, "coupon code already exists"))?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Delete a coupon.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the coupon doesn't exist.
    pub async fn delete(&self, id: CouponId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.coupon WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
