//! Subscription plan and subscription repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use quillhouse_core::{
    Money, PlanId, SubscriptionId, SubscriptionStatus, TransactionKind, TransactionStatus, UserId,
};

use super::{RepositoryError, inr};
use crate::models::subscription::{Plan, PlanInput, Subscription};

#[derive(Debug, sqlx::FromRow)]
struct PlanRow {
    id: i32,
    name: String,
    description: String,
    price: Decimal,
    duration_days: i32,
    active: bool,
}

impl From<PlanRow> for Plan {
    fn from(row: PlanRow) -> Self {
        Self {
            id: PlanId::new(row.id),
            name: row.name,
            description: row.description,
            price: inr(row.price),
            duration_days: row.duration_days,
            active: row.active,
        }
    }
}

const SUBSCRIPTION_SELECT: &str = r"
    SELECT s.id, s.user_id, s.plan_id, p.name AS plan_name, s.amount, s.status,
           s.starts_at, s.ends_at, s.gateway_order_id, s.created_at
    FROM shop.subscription s
    JOIN shop.subscription_plan p ON p.id = s.plan_id
";

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: i32,
    user_id: i32,
    plan_id: i32,
    plan_name: String,
    amount: Decimal,
    status: SubscriptionStatus,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    gateway_order_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<SubscriptionRow> for Subscription {
    fn from(row: SubscriptionRow) -> Self {
        Self {
            id: SubscriptionId::new(row.id),
            user_id: UserId::new(row.user_id),
            plan_id: PlanId::new(row.plan_id),
            plan_name: row.plan_name,
            amount: inr(row.amount),
            status: row.status,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            gateway_order_id: row.gateway_order_id,
            created_at: row.created_at,
        }
    }
}

/// Repository for plans and subscriptions.
pub struct SubscriptionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SubscriptionRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Plans
    // =========================================================================

    /// Plans, cheapest first. `active_only` hides retired plans.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_plans(&self, active_only: bool) -> Result<Vec<Plan>, RepositoryError> {
        let rows = sqlx::query_as::<_, PlanRow>(
            r"
            SELECT id, name, description, price, duration_days, active
            FROM shop.subscription_plan
            WHERE active OR NOT $1
            ORDER BY price, id
            ",
        )
        .bind(active_only)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a plan.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_plan(&self, id: PlanId) -> Result<Option<Plan>, RepositoryError> {
        let row = sqlx::query_as::<_, PlanRow>(
            r"
            SELECT id, name, description, price, duration_days, active
            FROM shop.subscription_plan
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Create a plan.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_plan(&self, input: &PlanInput) -> Result<Plan, RepositoryError> {
        let row = sqlx::query_as::<_, PlanRow>(
            r"
            INSERT INTO shop.subscription_plan (name, description, price, duration_days, active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, description, price, duration_days, active
            ",
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price)
        .bind(input.duration_days)
        .bind(input.active)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Replace a plan. Existing subscriptions keep their dates.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the plan doesn't exist.
    pub async fn update_plan(&self, id: PlanId, input: &PlanInput) -> Result<Plan, RepositoryError> {
        let row = sqlx::query_as::<_, PlanRow>(
            r"
            UPDATE shop.subscription_plan
            SET name = $2, description = $3, price = $4, duration_days = $5, active = $6
            WHERE id = $1
            RETURNING id, name, description, price, duration_days, active
            ",
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price)
        .bind(input.duration_days)
        .bind(input.active)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// The user's latest active, unexpired subscription.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn current_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<Subscription>, RepositoryError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            r"
            {SUBSCRIPTION_SELECT}
            WHERE s.user_id = $1 AND s.status = $2 AND s.ends_at > NOW()
            ORDER BY s.ends_at DESC
            LIMIT 1
            "
        ))
        .bind(user_id)
        .bind(SubscriptionStatus::Active)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Record a subscription awaiting payment of `amount`.
    ///
    /// The amount is what the gateway order was created for; activation
    /// records it in the ledger even if the plan price changes meanwhile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_pending(
        &self,
        user_id: UserId,
        plan_id: PlanId,
        amount: Money,
        gateway_order_id: &str,
    ) -> Result<Subscription, RepositoryError> {
        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO shop.subscription (user_id, plan_id, amount, gateway_order_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(user_id)
        .bind(plan_id)
        .bind(amount.amount)
        .bind(gateway_order_id)
        .fetch_one(self.pool)
        .await?;

        self.get(SubscriptionId::new(id))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Get a subscription.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: SubscriptionId) -> Result<Option<Subscription>, RepositoryError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!("{SUBSCRIPTION_SELECT} WHERE s.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// A user's subscription by payment gateway order id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_gateway_order(
        &self,
        user_id: UserId,
        gateway_order_id: &str,
    ) -> Result<Option<Subscription>, RepositoryError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "{SUBSCRIPTION_SELECT} WHERE s.user_id = $1 AND s.gateway_order_id = $2"
        ))
        .bind(user_id)
        .bind(gateway_order_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Activate a paid subscription and record the amount charged for it.
    ///
    /// A renewal while an earlier subscription is still running starts when
    /// that one ends.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the subscription is not pending.
    pub async fn activate(
        &self,
        id: SubscriptionId,
        gateway_payment_id: &str,
    ) -> Result<Subscription, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let activated: Option<(i32, Decimal)> = sqlx::query_as(
            r"
            WITH current_end AS (
                SELECT MAX(ends_at) AS ends_at
                FROM shop.subscription
                WHERE user_id = (SELECT user_id FROM shop.subscription WHERE id = $1)
                  AND status = $3 AND ends_at > NOW()
            )
            UPDATE shop.subscription s
            SET status = $3,
                gateway_payment_id = $2,
                starts_at = GREATEST(NOW(), COALESCE((SELECT ends_at FROM current_end), NOW())),
                ends_at = GREATEST(NOW(), COALESCE((SELECT ends_at FROM current_end), NOW()))
                          + make_interval(days => p.duration_days)
            FROM shop.subscription_plan p
            WHERE s.id = $1 AND s.status = $4 AND p.id = s.plan_id
            RETURNING s.user_id, s.amount
            ",
        )
        .bind(id)
        .bind(gateway_payment_id)
        .bind(SubscriptionStatus::Active)
        .bind(SubscriptionStatus::Pending)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((user_id, amount)) = activated else {
            return Err(RepositoryError::Conflict(
                "subscription is not awaiting payment".to_owned(),
            ));
        };

        sqlx::query(
            r"
            INSERT INTO shop.transaction (subscription_id, user_id, kind, status, gateway_ref, amount)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(id)
        .bind(user_id)
        .bind(TransactionKind::Payment)
        .bind(TransactionStatus::Captured)
        .bind(gateway_payment_id)
        .bind(amount)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Mark active subscriptions past their end date as expired.
    ///
    /// Returns the number of subscriptions expired.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn expire_stale(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE shop.subscription SET status = $2 WHERE status = $1 AND ends_at <= NOW()",
        )
        .bind(SubscriptionStatus::Active)
        .bind(SubscriptionStatus::Expired)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
