//! Customer-side order actions.

use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use quillhouse_commerce::db::OrderRepository;
use quillhouse_commerce::email::Mailer;
use quillhouse_commerce::models::Order;
use quillhouse_commerce::razorpay::RazorpayClient;
use quillhouse_commerce::refunds;
use quillhouse_core::{Money, OrderId};

use crate::error::AppError;
use crate::models::CurrentUser;

/// Result of a customer cancellation.
#[derive(Debug, Clone, Serialize)]
pub struct Cancellation {
    pub order: Order,
    /// Amount sent back to the customer's payment method.
    pub refunded: Option<Money>,
}

/// Cancel one of the customer's orders, refunding it if paid.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the order isn't the customer's,
/// `AppError::Conflict` once it can no longer be cancelled, and
/// `AppError::Payment` if the refund is refused.
#[instrument(skip(pool, razorpay, mailer, user), fields(user_id = %user.id))]
pub async fn cancel(
    pool: &PgPool,
    razorpay: &RazorpayClient,
    mailer: &Mailer,
    user: &CurrentUser,
    order_id: OrderId,
    reason: Option<&str>,
) -> Result<Cancellation, AppError> {
    let orders = OrderRepository::new(pool);

    let order = orders
        .get_for_user(order_id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {order_id}")))?;

    let refund = refunds::cancel_order(pool, razorpay, &order, reason, true).await?;

    let order = orders
        .get(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {order_id}")))?;

    let refunded = refund.map(|r| r.amount);
    mailer
        .order_cancelled(user.email.as_str(), user.greeting_name(), &order, refunded)
        .await;

    Ok(Cancellation { order, refunded })
}
