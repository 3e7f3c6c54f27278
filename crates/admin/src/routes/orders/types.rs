//! Request and response types for the order routes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use quillhouse_commerce::models::{Order, Transaction, UserAccount};
use quillhouse_commerce::refunds::RefundOutcome;
use quillhouse_core::{Email, Money, OrderStatus, PaymentStatus, TransactionStatus, UserId};

/// Order listing filters.
#[derive(Debug, Default, Deserialize)]
pub struct OrdersQuery {
    pub status: Option<OrderStatus>,
    pub page: Option<u32>,
}

/// The buyer, as shown on the order page.
#[derive(Debug, Serialize)]
pub struct CustomerView {
    pub id: UserId,
    pub email: Email,
    pub name: Option<String>,
    pub phone: Option<String>,
}

impl From<UserAccount> for CustomerView {
    fn from(user: UserAccount) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.display_name,
            phone: user.phone,
        }
    }
}

/// Order page: the order, its buyer, ledger entries and allowed next steps.
#[derive(Debug, Serialize)]
pub struct OrderDetailView {
    pub order: Order,
    pub customer: Option<CustomerView>,
    pub transactions: Vec<Transaction>,
    pub next_statuses: Vec<OrderStatus>,
    pub refunded: Money,
}

/// Status change body.
#[derive(Debug, Deserialize)]
pub struct StatusInput {
    pub status: OrderStatus,
}

/// Cancellation body.
#[derive(Debug, Default, Deserialize)]
pub struct CancelInput {
    pub reason: Option<String>,
}

/// Refund body. Without an amount, everything still refundable is refunded.
#[derive(Debug, Default, Deserialize)]
pub struct RefundInput {
    pub amount: Option<Decimal>,
    pub note: Option<String>,
}

/// Result of a refund.
#[derive(Debug, Serialize)]
pub struct RefundView {
    pub amount: Money,
    pub refund_id: String,
    pub status: TransactionStatus,
    pub payment_status: PaymentStatus,
}

impl From<RefundOutcome> for RefundView {
    fn from(outcome: RefundOutcome) -> Self {
        Self {
            amount: outcome.amount,
            refund_id: outcome.refund_id,
            status: outcome.status,
            payment_status: outcome.payment_status,
        }
    }
}

/// Result of a back-office cancellation.
#[derive(Debug, Serialize)]
pub struct CancellationView {
    pub order: Order,
    pub refund: Option<RefundView>,
}
