//! Order repository.
//!
//! Payment capture, cancellation and refunds each run in a single database
//! transaction so the order row, the ledger, coupon usage, stock and the
//! e-book library always move together.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use quillhouse_core::coupon::CouponRules;
use quillhouse_core::order_flow::{CaptureRefusal, check_stock};
use quillhouse_core::{
    AuthorId, BookFormat, BookId, LibrarySource, Money, OrderId, OrderItemId, OrderStatus,
    PaymentStatus, TransactionKind, TransactionStatus, UserId,
};

use super::coupons::lock_for_redemption;
use super::{PAGE_SIZE, RepositoryError, inr, page_offset};
use crate::models::order::{NewOrder, Order, OrderItem, ShippingAddress};

const ORDER_COLUMNS: &str = r"
    id, order_number, user_id, status, payment_status, subtotal, discount, shipping_fee,
    total, coupon_code, affiliate_code, shipping_address, gateway_order_id,
    gateway_payment_id, shiprocket_order_id, shipment_id, awb_code, courier_name,
    cancel_reason, placed_at, created_at, updated_at
";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    order_number: String,
    user_id: i32,
    status: OrderStatus,
    payment_status: PaymentStatus,
    subtotal: Decimal,
    discount: Decimal,
    shipping_fee: Decimal,
    total: Decimal,
    coupon_code: Option<String>,
    affiliate_code: Option<String>,
    shipping_address: Option<Json<ShippingAddress>>,
    gateway_order_id: Option<String>,
    gateway_payment_id: Option<String>,
    shiprocket_order_id: Option<i64>,
    shipment_id: Option<i64>,
    awb_code: Option<String>,
    courier_name: Option<String>,
    cancel_reason: Option<String>,
    placed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: OrderId::new(row.id),
            order_number: row.order_number,
            user_id: UserId::new(row.user_id),
            status: row.status,
            payment_status: row.payment_status,
            subtotal: inr(row.subtotal),
            discount: inr(row.discount),
            shipping_fee: inr(row.shipping_fee),
            total: inr(row.total),
            coupon_code: row.coupon_code,
            affiliate_code: row.affiliate_code,
            shipping_address: row.shipping_address.map(|j| j.0),
            gateway_order_id: row.gateway_order_id,
            gateway_payment_id: row.gateway_payment_id,
            shiprocket_order_id: row.shiprocket_order_id,
            shipment_id: row.shipment_id,
            awb_code: row.awb_code,
            courier_name: row.courier_name,
            cancel_reason: row.cancel_reason,
            placed_at: row.placed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            items: Vec::new(),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: i32,
    order_id: i32,
    book_id: i32,
    title: String,
    author_id: i32,
    format: BookFormat,
    unit_price: Decimal,
    quantity: i32,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: OrderItemId::new(row.id),
            order_id: OrderId::new(row.order_id),
            book_id: BookId::new(row.book_id),
            title: row.title,
            author_id: AuthorId::new(row.author_id),
            format: row.format,
            unit_price: inr(row.unit_price),
            quantity: row.quantity,
        }
    }
}

/// A refund to record against an order.
#[derive(Debug, Clone)]
pub struct RefundRecord<'a> {
    pub amount: Money,
    /// Razorpay refund id.
    pub gateway_ref: &'a str,
    pub status: TransactionStatus,
    pub payment_status: PaymentStatus,
    /// New order status, if the refund changes it.
    pub order_status: Option<OrderStatus>,
    pub note: Option<&'a str>,
}

/// Shipment details returned by the shipping provider.
#[derive(Debug, Clone)]
pub struct ShipmentRecord<'a> {
    pub shiprocket_order_id: i64,
    pub shipment_id: i64,
    pub awb_code: Option<&'a str>,
    pub courier_name: Option<&'a str>,
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order awaiting payment, with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_pending(&self, new: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO shop.order (
                user_id, subtotal, discount, shipping_fee, total, currency,
                coupon_code, affiliate_code, shipping_address
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(new.user_id)
        .bind(new.totals.subtotal.amount)
        .bind(new.totals.discount.amount)
        .bind(new.totals.shipping_fee.amount)
        .bind(new.totals.total.amount)
        .bind(new.totals.total.currency.code())
        .bind(new.coupon_code.as_deref())
        .bind(new.affiliate_code.as_deref())
        .bind(new.shipping_address.clone().map(Json))
        .fetch_one(&mut *tx)
        .await?;

        let mut order = Order::from(row);

        if !new.items.is_empty() {
            let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
                "INSERT INTO shop.order_item (order_id, book_id, title, author_id, format, unit_price, quantity) ",
            );
            qb.push_values(&new.items, |mut b, item| {
                b.push_bind(order.id)
                    .push_bind(item.book_id)
                    .push_bind(item.title.clone())
                    .push_bind(item.author_id)
                    .push_bind(item.format)
                    .push_bind(item.unit_price.amount)
                    .push_bind(item.quantity);
            });
            qb.push(" RETURNING id, order_id, book_id, title, author_id, format, unit_price, quantity");

            let items = qb
                .build_query_as::<OrderItemRow>()
                .fetch_all(&mut *tx)
                .await?;
            order.items = items.into_iter().map(Into::into).collect();
        }

        tx.commit().await?;

        Ok(order)
    }

    /// Store the payment gateway's order id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    pub async fn set_gateway_order(
        &self,
        id: OrderId,
        gateway_order_id: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE shop.order SET gateway_order_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(gateway_order_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Get an order with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.order WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        self.with_items(row).await
    }

    /// Get an order only if it belongs to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(
        &self,
        id: OrderId,
        user_id: UserId,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.order WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        self.with_items(row).await
    }

    /// Find an order by the payment gateway's order id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_gateway_order(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.order WHERE gateway_order_id = $1"
        ))
        .bind(gateway_order_id)
        .fetch_optional(self.pool)
        .await?;

        self.with_items(row).await
    }

    /// A customer's orders, newest first, without items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.order WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// All orders, newest first, optionally by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        status: Option<OrderStatus>,
        page: Option<u32>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM shop.order WHERE TRUE"));

        if let Some(status) = status {
            qb.push(" AND status = ").push_bind(status);
        }

        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(PAGE_SIZE)
            .push(" OFFSET ")
            .push_bind(page_offset(page));

        let rows = qb.build_query_as::<OrderRow>().fetch_all(self.pool).await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Record a captured payment and place the order.
    ///
    /// In one transaction, with the order, coupon and book rows locked:
    /// coupon limits and print stock are checked again, then the order
    /// becomes `placed`/`paid`, a captured payment is added to the ledger,
    /// the coupon's usage count goes up, print stock goes down and e-books
    /// are added to the buyer's library.
    ///
    /// If a limit or the stock ran out since checkout, the payment is still
    /// recorded but the order is cancelled untouched, and
    /// [`CaptureOutcome::Refused`] tells the caller to refund it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    /// Returns `RepositoryError::Conflict` if the order is no longer awaiting payment.
    pub async fn capture_payment(
        &self,
        id: OrderId,
        gateway_payment_id: &str,
    ) -> Result<CaptureOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.order WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        if row.status != OrderStatus::PendingPayment {
            return Err(RepositoryError::Conflict(
                "order is not awaiting payment".to_owned(),
            ));
        }

        let mut pending = Order::from(row);
        pending.items = load_items(&mut tx, id).await?;

        let coupon = match pending.coupon_code.as_deref() {
            Some(code) => lock_for_redemption(&mut tx, code, pending.user_id).await?,
            None => None,
        };
        let demand = print_demand(&pending.items);
        let stock = lock_stock(&mut tx, &demand).await?;

        let check = check_capture(
            coupon.as_ref().map(|(rules, uses)| (rules, *uses)),
            &demand,
            &stock,
        );

        if let Err(refusal) = check {
            let row = sqlx::query_as::<_, OrderRow>(&format!(
                r"
                UPDATE shop.order
                SET status = $2, payment_status = $3, gateway_payment_id = $4,
                    cancel_reason = $5, updated_at = NOW()
                WHERE id = $1
                RETURNING {ORDER_COLUMNS}
                "
            ))
            .bind(id)
            .bind(OrderStatus::Cancelled)
            .bind(PaymentStatus::Paid)
            .bind(gateway_payment_id)
            .bind(refusal.to_string())
            .fetch_one(&mut *tx)
            .await?;

            let mut order = Order::from(row);
            order.items = pending.items;

            insert_transaction(
                &mut tx,
                &order,
                TransactionKind::Payment,
                TransactionStatus::Captured,
                Some(gateway_payment_id),
                order.total,
                Some("not fulfilled"),
            )
            .await?;

            tx.commit().await?;

            return Ok(CaptureOutcome::Refused { order, refusal });
        }

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            UPDATE shop.order
            SET status = $2, payment_status = $3, gateway_payment_id = $4,
                placed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(OrderStatus::Placed)
        .bind(PaymentStatus::Paid)
        .bind(gateway_payment_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut order = Order::from(row);
        order.items = pending.items;

        insert_transaction(
            &mut tx,
            &order,
            TransactionKind::Payment,
            TransactionStatus::Captured,
            Some(gateway_payment_id),
            order.total,
            None,
        )
        .await?;

        if let Some(code) = order.coupon_code.as_deref() {
            sqlx::query(
                "UPDATE shop.coupon SET usage_count = usage_count + 1, updated_at = NOW() WHERE code = $1",
            )
            .bind(code)
            .execute(&mut *tx)
            .await?;
        }

        for (book, quantity) in &demand {
            sqlx::query(
                "UPDATE shop.book SET stock = stock - $2, updated_at = NOW() WHERE id = $1 AND stock >= $2",
            )
            .bind(*book)
            .bind(*quantity)
            .execute(&mut *tx)
            .await?;
        }

        for item in order.items.iter().filter(|i| i.format == BookFormat::Ebook) {
            sqlx::query(
                r"
                INSERT INTO shop.library_entry (user_id, book_id, source)
                VALUES ($1, $2, $3)
                ON CONFLICT (user_id, book_id) DO UPDATE SET source = EXCLUDED.source
                ",
            )
            .bind(order.user_id)
            .bind(item.book_id)
            .bind(LibrarySource::Purchase)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(CaptureOutcome::Placed(order))
    }

    /// Mark a pending order's payment as failed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_payment_failed(&self, id: OrderId) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE shop.order
            SET payment_status = $2, updated_at = NOW()
            WHERE id = $1 AND status = $3
            ",
        )
        .bind(id)
        .bind(PaymentStatus::Failed)
        .bind(OrderStatus::PendingPayment)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Move an order from `from` to `to`.
    ///
    /// The caller checks the transition; the `WHERE` guard only protects
    /// against a concurrent change.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order is no longer in `from`.
    pub async fn update_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE shop.order SET status = $3, updated_at = NOW() WHERE id = $1 AND status = $2",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(
                "order status changed concurrently".to_owned(),
            ));
        }

        Ok(())
    }

    /// Cancel an order, returning print stock if the order had been paid.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order's status changed since
    /// it was loaded.
    pub async fn cancel(
        &self,
        order: &Order,
        reason: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r"
            UPDATE shop.order
            SET status = $3, cancel_reason = $4, updated_at = NOW()
            WHERE id = $1 AND status = $2
            ",
        )
        .bind(order.id)
        .bind(order.status)
        .bind(OrderStatus::Cancelled)
        .bind(reason)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(
                "order status changed concurrently".to_owned(),
            ));
        }

        if order.status != OrderStatus::PendingPayment {
            for item in order.items.iter().filter(|i| i.format.is_physical()) {
                sqlx::query(
                    "UPDATE shop.book SET stock = stock + $2, updated_at = NOW() WHERE id = $1",
                )
                .bind(item.book_id)
                .bind(item.quantity)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        Ok(())
    }

    /// Record a refund and update the order's payment (and maybe order) status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn record_refund(
        &self,
        order: &Order,
        refund: &RefundRecord<'_>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        insert_transaction(
            &mut tx,
            order,
            TransactionKind::Refund,
            refund.status,
            Some(refund.gateway_ref),
            refund.amount,
            refund.note,
        )
        .await?;

        sqlx::query(
            r"
            UPDATE shop.order
            SET payment_status = $2, status = COALESCE($3, status), updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(order.id)
        .bind(refund.payment_status)
        .bind(refund.order_status)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Sum of refunds already issued for an order (failed ones excluded).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn refunded_total(&self, id: OrderId) -> Result<Money, RepositoryError> {
        let total: Decimal = sqlx::query_scalar(
            r"
            SELECT COALESCE(SUM(amount), 0)
            FROM shop.transaction
            WHERE order_id = $1 AND kind = $2 AND status <> $3
            ",
        )
        .bind(id)
        .bind(TransactionKind::Refund)
        .bind(TransactionStatus::Failed)
        .fetch_one(self.pool)
        .await?;

        Ok(inr(total))
    }

    /// Store shipment details and move the order to `processing` if it was
    /// just `placed`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    pub async fn set_shipment(
        &self,
        id: OrderId,
        shipment: &ShipmentRecord<'_>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.order
            SET shiprocket_order_id = $2, shipment_id = $3, awb_code = $4, courier_name = $5,
                status = CASE WHEN status = $6 THEN $7 ELSE status END,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(shipment.shiprocket_order_id)
        .bind(shipment.shipment_id)
        .bind(shipment.awb_code)
        .bind(shipment.courier_name)
        .bind(OrderStatus::Placed)
        .bind(OrderStatus::Processing)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn with_items(&self, row: Option<OrderRow>) -> Result<Option<Order>, RepositoryError> {
        let Some(row) = row else {
            return Ok(None);
        };

        let mut order = Order::from(row);
        let mut conn = self.pool.acquire().await?;
        order.items = load_items(&mut conn, order.id).await?;

        Ok(Some(order))
    }
}

/// Result of [`OrderRepository::capture_payment`].
#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    /// The order was placed.
    Placed(Order),
    /// The payment was recorded but the order was cancelled; it needs a refund.
    Refused {
        order: Order,
        refusal: CaptureRefusal,
    },
}

/// Print copies an order takes, per book.
fn print_demand(items: &[OrderItem]) -> BTreeMap<BookId, i32> {
    let mut demand = BTreeMap::new();
    for item in items.iter().filter(|i| i.format.is_physical()) {
        *demand.entry(item.book_id).or_insert(0) += item.quantity;
    }
    demand
}

/// Lock the stock rows of the ordered print books, in id order.
async fn lock_stock(
    conn: &mut PgConnection,
    demand: &BTreeMap<BookId, i32>,
) -> Result<HashMap<BookId, i32>, RepositoryError> {
    if demand.is_empty() {
        return Ok(HashMap::new());
    }

    let ids: Vec<i32> = demand.keys().map(BookId::as_i32).collect();
    let rows: Vec<(i32, i32)> =
        sqlx::query_as("SELECT id, stock FROM shop.book WHERE id = ANY($1) ORDER BY id FOR UPDATE")
            .bind(&ids)
            .fetch_all(&mut *conn)
            .await?;

    Ok(rows
        .into_iter()
        .map(|(id, stock)| (BookId::new(id), stock))
        .collect())
}

/// Whether a paid order can still be placed, given the locked rows.
///
/// `coupon` is the coupon's rules with the buyer's earlier uses. A book
/// missing from `stock` has none left.
fn check_capture(
    coupon: Option<(&CouponRules, i64)>,
    demand: &BTreeMap<BookId, i32>,
    stock: &HashMap<BookId, i32>,
) -> Result<(), CaptureRefusal> {
    if let Some((rules, uses)) = coupon {
        rules.check_redemption(uses)?;
    }

    for (book, requested) in demand {
        let available = stock.get(book).copied().unwrap_or(0);
        check_stock(*book, available, *requested)?;
    }

    Ok(())
}

async fn load_items(conn: &mut PgConnection, id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
    let rows = sqlx::query_as::<_, OrderItemRow>(
        r"
        SELECT id, order_id, book_id, title, author_id, format, unit_price, quantity
        FROM shop.order_item
        WHERE order_id = $1
        ORDER BY id
        ",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

async fn insert_transaction(
    conn: &mut PgConnection,
    order: &Order,
    kind: TransactionKind,
    status: TransactionStatus,
    gateway_ref: Option<&str>,
    amount: Money,
    note: Option<&str>,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO shop.transaction (order_id, user_id, kind, status, gateway_ref, amount, note)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ",
    )
    .bind(order.id)
    .bind(order.user_id)
    .bind(kind)
    .bind(status)
    .bind(gateway_ref)
    .bind(amount.amount)
    .bind(note)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use quillhouse_core::DiscountKind;
    use quillhouse_core::coupon::CouponError;

    use super::*;

    fn item(book: i32, format: BookFormat, quantity: i32) -> OrderItem {
        OrderItem {
            id: OrderItemId::new(book),
            order_id: OrderId::new(1),
            book_id: BookId::new(book),
            title: format!("Book {book}"),
            author_id: AuthorId::new(1),
            format,
            unit_price: Money::inr(Decimal::from(250)),
            quantity,
        }
    }

    fn coupon(usage_limit: Option<i32>, usage_count: i32, per_user_limit: Option<i32>) -> CouponRules {
        CouponRules {
            code: "LAUNCH".to_owned(),
            kind: DiscountKind::Fixed,
            value: Decimal::from(50),
            max_discount: None,
            min_order_value: None,
            usage_limit,
            usage_count,
            per_user_limit,
            starts_at: None,
            expires_at: None,
            active: true,
        }
    }

    #[test]
    fn test_print_demand_sums_print_lines() {
        let demand = print_demand(&[
            item(4, BookFormat::Print, 2),
            item(4, BookFormat::Ebook, 1),
            item(9, BookFormat::Print, 1),
            item(4, BookFormat::Print, 1),
        ]);

        assert_eq!(demand.len(), 2);
        assert_eq!(demand.get(&BookId::new(4)), Some(&3));
        assert_eq!(demand.get(&BookId::new(9)), Some(&1));
    }

    #[test]
    fn test_capture_within_limits() {
        let demand = print_demand(&[item(4, BookFormat::Print, 2)]);
        let stock = HashMap::from([(BookId::new(4), 2)]);
        let rules = coupon(Some(100), 99, Some(1));

        assert_eq!(check_capture(Some((&rules, 0)), &demand, &stock), Ok(()));
    }

    #[test]
    fn test_capture_refused_when_coupon_used_up() {
        let demand = BTreeMap::new();
        let stock = HashMap::new();

        let rules = coupon(Some(100), 100, None);
        assert_eq!(
            check_capture(Some((&rules, 0)), &demand, &stock),
            Err(CaptureRefusal::Coupon(CouponError::UsageLimitReached))
        );

        // A second checkout by the same buyer captured first.
        let rules = coupon(None, 1, Some(1));
        assert_eq!(
            check_capture(Some((&rules, 1)), &demand, &stock),
            Err(CaptureRefusal::Coupon(CouponError::UserLimitReached))
        );
    }

    #[test]
    fn test_capture_refused_when_stock_sold_out() {
        let demand = print_demand(&[item(4, BookFormat::Print, 3)]);
        let stock = HashMap::from([(BookId::new(4), 2)]);

        assert_eq!(
            check_capture(None, &demand, &stock),
            Err(CaptureRefusal::OutOfStock {
                book: BookId::new(4),
                available: 2,
                requested: 3,
            })
        );
    }

    #[test]
    fn test_capture_refused_when_book_gone() {
        let demand = print_demand(&[item(12, BookFormat::Print, 1)]);

        let refusal = check_capture(None, &demand, &HashMap::new()).unwrap_err();
        assert!(matches!(refusal, CaptureRefusal::OutOfStock { available: 0, .. }));
    }
}
