//! Cancellation and refund flows shared by the storefront and back-office.
//!
//! Both run the same steps: check the order state, call Razorpay, then
//! record the result in one database transaction.

use sqlx::PgPool;
use thiserror::Error;

use quillhouse_core::order_flow::{RefundError, payment_status_after_refund, refund_eligibility};
use quillhouse_core::{Money, OrderStatus, PaymentStatus, TransactionStatus};

use crate::db::orders::RefundRecord;
use crate::db::{OrderRepository, RepositoryError};
use crate::models::order::Order;
use crate::razorpay::{RazorpayClient, RazorpayError};

/// Errors from the cancel and refund flows.
#[derive(Debug, Error)]
pub enum RefundFlowError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Gateway(#[from] RazorpayError),

    #[error(transparent)]
    Ineligible(#[from] RefundError),

    /// The order cannot move to the requested status.
    #[error("order in status {0} cannot be cancelled")]
    NotCancellable(OrderStatus),

    /// A customer tried to cancel an order already booked with the courier.
    #[error("order {0} is already booked for shipping")]
    ShipmentBooked(String),

    /// A paid order without a gateway payment id.
    #[error("order {0} has no captured payment")]
    MissingPayment(String),
}

/// Outcome of a refund request.
#[derive(Debug, Clone)]
pub struct RefundOutcome {
    pub amount: Money,
    pub refund_id: String,
    pub status: TransactionStatus,
    pub payment_status: PaymentStatus,
}

/// Map Razorpay's refund status onto the ledger's status.
fn transaction_status(gateway_status: &str) -> TransactionStatus {
    match gateway_status {
        "processed" => TransactionStatus::Processed,
        "failed" => TransactionStatus::Failed,
        _ => TransactionStatus::Pending,
    }
}

/// Refund `requested` (or everything still refundable) of a paid order.
///
/// A full refund of an order that is not already cancelled moves it to
/// `refunded`; partial refunds leave the order status alone.
///
/// # Errors
///
/// Returns `RefundFlowError::Ineligible` if the order cannot be refunded,
/// `RefundFlowError::Gateway` if Razorpay refuses the refund.
pub async fn refund_order(
    pool: &PgPool,
    razorpay: &RazorpayClient,
    order: &Order,
    requested: Option<Money>,
    note: Option<&str>,
) -> Result<RefundOutcome, RefundFlowError> {
    let orders = OrderRepository::new(pool);
    let already_refunded = orders.refunded_total(order.id).await?;

    let amount = refund_eligibility(
        order.status,
        order.payment_status,
        already_refunded,
        order.total,
        requested,
    )?;

    let payment_id = order
        .gateway_payment_id
        .as_deref()
        .ok_or_else(|| RefundFlowError::MissingPayment(order.order_number.clone()))?;

    let refund = razorpay.refund(payment_id, amount).await?;
    let status = transaction_status(&refund.status);

    let payment_status = if status == TransactionStatus::Failed {
        order.payment_status
    } else {
        payment_status_after_refund(order.total, already_refunded, amount)
    };

    let order_status = (payment_status == PaymentStatus::Refunded
        && order.status != OrderStatus::Cancelled)
        .then_some(OrderStatus::Refunded);

    orders
        .record_refund(
            order,
            &RefundRecord {
                amount,
                gateway_ref: &refund.id,
                status,
                payment_status,
                order_status,
                note,
            },
        )
        .await?;

    tracing::info!(
        order = %order.order_number,
        refund_id = %refund.id,
        amount = %amount,
        status = status.as_str(),
        "Refund recorded"
    );

    Ok(RefundOutcome {
        amount,
        refund_id: refund.id,
        status,
        payment_status,
    })
}

/// Check that `order` may be cancelled.
///
/// Customers are limited to the statuses they may cancel from, and cannot
/// cancel once a shipment is booked: only the back-office can also cancel
/// the courier booking.
fn ensure_cancellable(order: &Order, customer: bool) -> Result<(), RefundFlowError> {
    if customer {
        if !order.status.is_customer_cancellable() {
            return Err(RefundFlowError::NotCancellable(order.status));
        }
        if order.has_booked_shipment() {
            return Err(RefundFlowError::ShipmentBooked(order.order_number.clone()));
        }
        return Ok(());
    }

    if order.status.can_transition_to(OrderStatus::Cancelled) {
        Ok(())
    } else {
        Err(RefundFlowError::NotCancellable(order.status))
    }
}

/// Cancel an order and refund whatever was paid.
///
/// `customer` restricts cancellation to statuses a customer may cancel from
/// and to orders not yet booked with the courier.
/// Returns the refunded amount, if any.
///
/// The order is cancelled before the refund is requested. If Razorpay then
/// fails, the order stays cancelled and paid, and can be refunded from the
/// back-office.
///
/// # Errors
///
/// Returns `RefundFlowError::NotCancellable` if the status does not allow it,
/// `RefundFlowError::ShipmentBooked` for a customer cancel after booking.
pub async fn cancel_order(
    pool: &PgPool,
    razorpay: &RazorpayClient,
    order: &Order,
    reason: Option<&str>,
    customer: bool,
) -> Result<Option<RefundOutcome>, RefundFlowError> {
    ensure_cancellable(order, customer)?;

    OrderRepository::new(pool).cancel(order, reason).await?;
    tracing::info!(order = %order.order_number, customer, "Order cancelled");

    if order.total.is_zero()
        || !matches!(
            order.payment_status,
            PaymentStatus::Paid | PaymentStatus::PartiallyRefunded
        )
    {
        return Ok(None);
    }

    let cancelled = Order {
        status: OrderStatus::Cancelled,
        ..order.clone()
    };

    let outcome = refund_order(pool, razorpay, &cancelled, None, Some("order cancelled")).await?;

    Ok(Some(outcome))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use quillhouse_core::{OrderId, UserId};

    use super::*;

    fn order(status: OrderStatus) -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::new(9),
            order_number: "QH-100009".to_owned(),
            user_id: UserId::new(4),
            status,
            payment_status: PaymentStatus::Paid,
            subtotal: Money::zero(),
            discount: Money::zero(),
            shipping_fee: Money::zero(),
            total: Money::zero(),
            coupon_code: None,
            affiliate_code: None,
            shipping_address: None,
            gateway_order_id: None,
            gateway_payment_id: None,
            shiprocket_order_id: None,
            shipment_id: None,
            awb_code: None,
            courier_name: None,
            cancel_reason: None,
            placed_at: Some(now),
            created_at: now,
            updated_at: now,
            items: Vec::new(),
        }
    }

    #[test]
    fn test_customer_can_cancel_before_booking() {
        assert!(ensure_cancellable(&order(OrderStatus::Placed), true).is_ok());
        assert!(ensure_cancellable(&order(OrderStatus::Processing), true).is_ok());
    }

    #[test]
    fn test_customer_cannot_cancel_booked_shipment() {
        let booked = Order {
            shiprocket_order_id: Some(7001),
            shipment_id: Some(8001),
            awb_code: Some("1419110022".to_owned()),
            ..order(OrderStatus::Processing)
        };

        let err = ensure_cancellable(&booked, true).unwrap_err();
        assert!(matches!(err, RefundFlowError::ShipmentBooked(ref n) if n == "QH-100009"));

        // The back-office cancels the booking along with the order.
        assert!(ensure_cancellable(&booked, false).is_ok());
    }

    #[test]
    fn test_customer_cannot_cancel_shipped_order() {
        let err = ensure_cancellable(&order(OrderStatus::Shipped), true).unwrap_err();
        assert!(matches!(err, RefundFlowError::NotCancellable(OrderStatus::Shipped)));
    }

    #[test]
    fn test_transaction_status_mapping() {
        assert_eq!(transaction_status("processed"), TransactionStatus::Processed);
        assert_eq!(transaction_status("failed"), TransactionStatus::Failed);
        assert_eq!(transaction_status("pending"), TransactionStatus::Pending);
        assert_eq!(transaction_status("created"), TransactionStatus::Pending);
    }
}
