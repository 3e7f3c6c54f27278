//! Transaction ledger repository (read side).
//!
//! Entries are written by [`super::OrderRepository`] and
//! [`super::SubscriptionRepository`] inside their own transactions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use quillhouse_core::{
    OrderId, SubscriptionId, TransactionId, TransactionKind, TransactionStatus, UserId,
};

use super::{PAGE_SIZE, RepositoryError, inr, page_offset};
use crate::models::order::{Transaction, TransactionFilter};

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: i32,
    order_id: Option<i32>,
    subscription_id: Option<i32>,
    user_id: i32,
    kind: TransactionKind,
    status: TransactionStatus,
    gateway_ref: Option<String>,
    amount: Decimal,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<TransactionRow> for Transaction {
    fn from(row: TransactionRow) -> Self {
        Self {
            id: TransactionId::new(row.id),
            order_id: row.order_id.map(OrderId::new),
            subscription_id: row.subscription_id.map(SubscriptionId::new),
            user_id: UserId::new(row.user_id),
            kind: row.kind,
            status: row.status,
            gateway_ref: row.gateway_ref,
            amount: inr(row.amount),
            note: row.note,
            created_at: row.created_at,
        }
    }
}

/// Repository for the transaction ledger.
pub struct TransactionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TransactionRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Ledger entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, RepositoryError> {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            r"
            SELECT id, order_id, subscription_id, user_id, kind, status, gateway_ref,
                   amount, note, created_at
            FROM shop.transaction
            WHERE TRUE
            ",
        );

        if let Some(kind) = filter.kind {
            qb.push(" AND kind = ").push_bind(kind);
        }

        if let Some(order_id) = filter.order_id {
            qb.push(" AND order_id = ").push_bind(order_id);
        }

        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(PAGE_SIZE)
            .push(" OFFSET ")
            .push_bind(page_offset(filter.page));

        let rows = qb
            .build_query_as::<TransactionRow>()
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
