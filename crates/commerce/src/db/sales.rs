//! Sales lines and dashboard figures.
//!
//! Aggregation happens in [`quillhouse_core::sales::SalesReport`]; this module
//! only loads the sold lines.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use quillhouse_core::sales::SaleLine;
use quillhouse_core::{
    AuthorId, BookId, BookStatus, OrderId, OrderStatus, PaymentStatus, SubscriptionStatus,
};

use super::RepositoryError;

const SALE_LINES: &str = r"
    SELECT o.id AS order_id, o.placed_at, i.book_id, i.title, i.quantity,
           i.unit_price * i.quantity AS amount, a.royalty_rate
    FROM shop.order_item i
    JOIN shop.order o ON o.id = i.order_id
    JOIN shop.author a ON a.id = i.author_id
    WHERE o.payment_status IN ($1, $2)
      AND o.status NOT IN ($3, $4)
      AND o.placed_at IS NOT NULL
";

#[derive(Debug, sqlx::FromRow)]
struct SaleLineRow {
    order_id: i32,
    placed_at: DateTime<Utc>,
    book_id: i32,
    title: String,
    quantity: i32,
    amount: Decimal,
    royalty_rate: Decimal,
}

impl From<SaleLineRow> for SaleLine {
    fn from(row: SaleLineRow) -> Self {
        Self {
            order_id: OrderId::new(row.order_id),
            placed_at: row.placed_at,
            book_id: BookId::new(row.book_id),
            title: row.title,
            quantity: row.quantity,
            amount: row.amount,
            royalty_rate: row.royalty_rate,
        }
    }
}

/// Headline numbers for the back-office dashboard.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DashboardStats {
    pub total_orders: i64,
    pub orders_today: i64,
    pub revenue: Decimal,
    pub awaiting_shipment: i64,
    pub customers: i64,
    pub books_in_review: i64,
    pub active_subscriptions: i64,
}

/// Repository for sales figures.
pub struct SalesRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SalesRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Sold lines of one author's books.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines_for_author(&self, author_id: AuthorId) -> Result<Vec<SaleLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, SaleLineRow>(&format!(
            "{SALE_LINES} AND i.author_id = $5 ORDER BY o.placed_at"
        ))
        .bind(PaymentStatus::Paid)
        .bind(PaymentStatus::PartiallyRefunded)
        .bind(OrderStatus::Cancelled)
        .bind(OrderStatus::Refunded)
        .bind(author_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Every sold line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn all_lines(&self) -> Result<Vec<SaleLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, SaleLineRow>(&format!("{SALE_LINES} ORDER BY o.placed_at"))
            .bind(PaymentStatus::Paid)
            .bind(PaymentStatus::PartiallyRefunded)
            .bind(OrderStatus::Cancelled)
            .bind(OrderStatus::Refunded)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Dashboard figures in one round trip.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn dashboard(&self) -> Result<DashboardStats, RepositoryError> {
        let stats = sqlx::query_as::<_, DashboardStats>(
            r"
            SELECT
                (SELECT COUNT(*) FROM shop.order WHERE placed_at IS NOT NULL) AS total_orders,
                (SELECT COUNT(*) FROM shop.order
                 WHERE placed_at >= date_trunc('day', NOW())) AS orders_today,
                (SELECT COALESCE(SUM(total), 0) FROM shop.order
                 WHERE payment_status IN ($1, $2)) AS revenue,
                (SELECT COUNT(*) FROM shop.order WHERE status IN ($3, $4)) AS awaiting_shipment,
                (SELECT COUNT(*) FROM shop.user) AS customers,
                (SELECT COUNT(*) FROM shop.book WHERE status = $5) AS books_in_review,
                (SELECT COUNT(*) FROM shop.subscription
                 WHERE status = $6 AND ends_at > NOW()) AS active_subscriptions
            ",
        )
        .bind(PaymentStatus::Paid)
        .bind(PaymentStatus::PartiallyRefunded)
        .bind(OrderStatus::Placed)
        .bind(OrderStatus::Processing)
        .bind(BookStatus::PendingReview)
        .bind(SubscriptionStatus::Active)
        .fetch_one(self.pool)
        .await?;

        Ok(stats)
    }
}
