//! Order status transitions and refund rules.
//!
//! ```text
//! pending_payment -> placed -> processing -> shipped -> delivered
//!        |             |           |                       |
//!        +-----> cancelled <-------+                       |
//!                      |                                   |
//!                      +----------> refunded <-------------+
//! ```
//!
//! `placed` and `processing` may also go straight to `refunded`.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::coupon::CouponError;
use crate::types::{BookId, Money, OrderStatus, PaymentStatus};

impl OrderStatus {
    /// Whether an order in this status may move to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::PendingPayment, Self::Placed | Self::Cancelled)
                | (Self::Placed, Self::Processing | Self::Cancelled | Self::Refunded)
                | (
                    Self::Processing,
                    Self::Shipped | Self::Cancelled | Self::Refunded
                )
                | (Self::Shipped, Self::Delivered)
                | (Self::Delivered | Self::Cancelled, Self::Refunded)
        )
    }

    /// Whether the customer may cancel the order themselves.
    ///
    /// Once the parcel has shipped only an admin can act on it.
    #[must_use]
    pub const fn is_customer_cancellable(self) -> bool {
        matches!(self, Self::PendingPayment | Self::Placed | Self::Processing)
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Refunded)
    }

    /// Statuses reachable from this one.
    #[must_use]
    pub fn next_statuses(self) -> Vec<Self> {
        Self::ALL
            .iter()
            .copied()
            .filter(|next| self.can_transition_to(*next))
            .collect()
    }
}

/// Reasons a refund cannot be issued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefundError {
    #[error("order has not been paid")]
    NotPaid,
    #[error("order has already been fully refunded")]
    AlreadyRefunded,
    #[error("refund of {requested} exceeds refundable amount {refundable}")]
    ExceedsRefundable {
        requested: Decimal,
        refundable: Decimal,
    },
    #[error("refund amount must be positive")]
    InvalidAmount,
    #[error("orders in status {0} cannot be refunded")]
    InvalidState(OrderStatus),
}

/// Work out how much to refund.
///
/// `already_refunded` is the sum of processed refund transactions. When
/// `requested` is `None` the whole remaining amount is refunded.
///
/// # Errors
///
/// Returns a [`RefundError`] when the order is unpaid, fully refunded, in a
/// status that cannot be refunded, or the requested amount is out of range.
pub fn refund_eligibility(
    status: OrderStatus,
    payment: PaymentStatus,
    already_refunded: Money,
    total: Money,
    requested: Option<Money>,
) -> Result<Money, RefundError> {
    match payment {
        PaymentStatus::Paid | PaymentStatus::PartiallyRefunded => {}
        PaymentStatus::Refunded => return Err(RefundError::AlreadyRefunded),
        PaymentStatus::Pending | PaymentStatus::Failed => return Err(RefundError::NotPaid),
    }

    if !status.can_transition_to(OrderStatus::Refunded) {
        return Err(RefundError::InvalidState(status));
    }

    let refundable = total.saturating_sub(already_refunded);
    if refundable.is_zero() {
        return Err(RefundError::AlreadyRefunded);
    }

    let Some(requested) = requested else {
        return Ok(refundable);
    };

    if requested.amount <= Decimal::ZERO {
        return Err(RefundError::InvalidAmount);
    }

    if requested.amount > refundable.amount {
        return Err(RefundError::ExceedsRefundable {
            requested: requested.amount,
            refundable: refundable.amount,
        });
    }

    Ok(requested)
}

/// Why a paid order is refunded instead of placed.
///
/// Coupon limits and stock are checked at checkout, then again under row
/// locks when the payment is captured.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureRefusal {
    #[error("coupon can no longer be redeemed: {0}")]
    Coupon(#[from] CouponError),
    #[error("only {available} left of book {book}, {requested} ordered")]
    OutOfStock {
        book: BookId,
        available: i32,
        requested: i32,
    },
}

/// Check locked print stock against what the order takes.
///
/// # Errors
///
/// Returns `CaptureRefusal::OutOfStock` if `requested` exceeds `available`.
pub fn check_stock(
    book: BookId,
    available: i32,
    requested: i32,
) -> Result<(), CaptureRefusal> {
    if requested > available {
        return Err(CaptureRefusal::OutOfStock {
            book,
            available,
            requested,
        });
    }
    Ok(())
}

/// Payment status after refunding `refund` out of `total`, given what was
/// refunded before.
#[must_use]
pub fn payment_status_after_refund(
    total: Money,
    already_refunded: Money,
    refund: Money,
) -> PaymentStatus {
    if (already_refunded + refund).amount >= total.amount {
        PaymentStatus::Refunded
    } else {
        PaymentStatus::PartiallyRefunded
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn rupees(n: i64) -> Money {
        Money::inr(Decimal::from(n))
    }

    #[test]
    fn test_stock_check_at_capture() {
        assert_eq!(check_stock(BookId::new(3), 5, 5), Ok(()));

        let refusal = check_stock(BookId::new(3), 1, 2).unwrap_err();
        assert_eq!(
            refusal,
            CaptureRefusal::OutOfStock {
                book: BookId::new(3),
                available: 1,
                requested: 2,
            }
        );
        assert_eq!(refusal.to_string(), "only 1 left of book 3, 2 ordered");
    }

    #[test]
    fn test_coupon_refusal_message() {
        let refusal = CaptureRefusal::from(CouponError::UsageLimitReached);
        assert_eq!(
            refusal.to_string(),
            "coupon can no longer be redeemed: coupon usage limit reached"
        );
    }

    #[test]
    fn test_happy_path() {
        let path = [
            OrderStatus::PendingPayment,
            OrderStatus::Placed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ];
        for pair in path.windows(2) {
            if let [from, to] = pair {
                assert!(from.can_transition_to(*to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_no_skipping_or_reversing() {
        assert!(!OrderStatus::Placed.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Processing));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::PendingPayment.can_transition_to(OrderStatus::Refunded));
    }

    #[test]
    fn test_terminal() {
        assert!(OrderStatus::Refunded.is_terminal());
        assert!(OrderStatus::Refunded.next_statuses().is_empty());
        assert_eq!(
            OrderStatus::Cancelled.next_statuses(),
            vec![OrderStatus::Refunded]
        );
    }

    #[test]
    fn test_customer_cancellable() {
        assert!(OrderStatus::Placed.is_customer_cancellable());
        assert!(OrderStatus::Processing.is_customer_cancellable());
        assert!(!OrderStatus::Shipped.is_customer_cancellable());
        assert!(!OrderStatus::Delivered.is_customer_cancellable());
    }

    #[test]
    fn test_full_refund_by_default() {
        let amount = refund_eligibility(
            OrderStatus::Placed,
            PaymentStatus::Paid,
            Money::zero(),
            rupees(549),
            None,
        )
        .unwrap();
        assert_eq!(amount, rupees(549));
    }

    #[test]
    fn test_partial_refunds_accumulate() {
        let amount = refund_eligibility(
            OrderStatus::Delivered,
            PaymentStatus::PartiallyRefunded,
            rupees(200),
            rupees(500),
            None,
        )
        .unwrap();
        assert_eq!(amount, rupees(300));

        let err = refund_eligibility(
            OrderStatus::Delivered,
            PaymentStatus::PartiallyRefunded,
            rupees(200),
            rupees(500),
            Some(rupees(301)),
        )
        .unwrap_err();
        assert!(matches!(err, RefundError::ExceedsRefundable { .. }));
    }

    #[test]
    fn test_refund_rejections() {
        assert_eq!(
            refund_eligibility(
                OrderStatus::PendingPayment,
                PaymentStatus::Pending,
                Money::zero(),
                rupees(100),
                None
            ),
            Err(RefundError::NotPaid)
        );
        assert_eq!(
            refund_eligibility(
                OrderStatus::Refunded,
                PaymentStatus::Refunded,
                rupees(100),
                rupees(100),
                None
            ),
            Err(RefundError::AlreadyRefunded)
        );
        assert_eq!(
            refund_eligibility(
                OrderStatus::Shipped,
                PaymentStatus::Paid,
                Money::zero(),
                rupees(100),
                None
            ),
            Err(RefundError::InvalidState(OrderStatus::Shipped))
        );
        assert_eq!(
            refund_eligibility(
                OrderStatus::Placed,
                PaymentStatus::Paid,
                Money::zero(),
                rupees(100),
                Some(Money::zero())
            ),
            Err(RefundError::InvalidAmount)
        );
    }

    #[test]
    fn test_payment_status_after_refund() {
        assert_eq!(
            payment_status_after_refund(rupees(500), rupees(0), rupees(200)),
            PaymentStatus::PartiallyRefunded
        );
        assert_eq!(
            payment_status_after_refund(rupees(500), rupees(200), rupees(300)),
            PaymentStatus::Refunded
        );
    }
}
