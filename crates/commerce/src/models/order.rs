//! Orders, order items and the transaction ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quillhouse_core::{
    AuthorId, BookFormat, BookId, Money, OrderId, OrderItemId, OrderStatus, PaymentStatus,
    SubscriptionId, TransactionId, TransactionKind, TransactionStatus, UserId,
    cart::OrderTotals,
};

/// Where a print order is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub name: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "India".to_owned()
}

impl ShippingAddress {
    /// Check that the mandatory fields are filled in.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("name", &self.name),
            ("phone", &self.phone),
            ("line1", &self.line1),
            ("city", &self.city),
            ("state", &self.state),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{field} is required"));
            }
        }

        if self.pincode.len() != 6 || !self.pincode.chars().all(|c| c.is_ascii_digit()) {
            return Err("pincode must be 6 digits".to_owned());
        }

        Ok(())
    }
}

/// An order.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub subtotal: Money,
    pub discount: Money,
    pub shipping_fee: Money,
    pub total: Money,
    pub coupon_code: Option<String>,
    pub affiliate_code: Option<String>,
    pub shipping_address: Option<ShippingAddress>,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub shiprocket_order_id: Option<i64>,
    pub shipment_id: Option<i64>,
    pub awb_code: Option<String>,
    pub courier_name: Option<String>,
    pub cancel_reason: Option<String>,
    pub placed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Loaded separately; empty in listings.
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Whether any line needs physical delivery.
    #[must_use]
    pub fn has_print_items(&self) -> bool {
        self.items.iter().any(|i| i.format.is_physical())
    }

    /// Whether a Shiprocket order has been booked for this order.
    #[must_use]
    pub const fn has_booked_shipment(&self) -> bool {
        self.shiprocket_order_id.is_some() || self.shipment_id.is_some() || self.awb_code.is_some()
    }
}

/// One line of an order, with title and price frozen at checkout.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub book_id: BookId,
    pub title: String,
    pub author_id: AuthorId,
    pub format: BookFormat,
    pub unit_price: Money,
    pub quantity: i32,
}

/// An order about to be created.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub totals: OrderTotals,
    pub coupon_code: Option<String>,
    pub affiliate_code: Option<String>,
    pub shipping_address: Option<ShippingAddress>,
    pub items: Vec<NewOrderItem>,
}

/// A line of an order about to be created.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub book_id: BookId,
    pub title: String,
    pub author_id: AuthorId,
    pub format: BookFormat,
    pub unit_price: Money,
    pub quantity: i32,
}

/// A payment or refund ledger entry.
#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub order_id: Option<OrderId>,
    pub subscription_id: Option<SubscriptionId>,
    pub user_id: UserId,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    /// Razorpay payment or refund id.
    pub gateway_ref: Option<String>,
    pub amount: Money,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Transaction listing filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionFilter {
    pub kind: Option<TransactionKind>,
    pub order_id: Option<OrderId>,
    pub page: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            name: "Asha Rao".to_owned(),
            phone: "9876543210".to_owned(),
            line1: "12 MG Road".to_owned(),
            line2: None,
            city: "Bengaluru".to_owned(),
            state: "Karnataka".to_owned(),
            pincode: "560001".to_owned(),
            country: default_country(),
        }
    }

    #[test]
    fn test_valid_address() {
        assert!(address().validate().is_ok());
    }

    #[test]
    fn test_address_requires_fields() {
        let mut a = address();
        a.city = "  ".to_owned();
        assert_eq!(a.validate(), Err("city is required".to_owned()));
    }

    #[test]
    fn test_address_pincode() {
        let mut a = address();
        a.pincode = "56001".to_owned();
        assert!(a.validate().is_err());
        a.pincode = "56000A".to_owned();
        assert!(a.validate().is_err());
    }

    #[test]
    fn test_address_country_defaults() {
        let json = r#"{"name":"A","phone":"1","line1":"x","city":"c","state":"s","pincode":"110001"}"#;
        let a: ShippingAddress = serde_json::from_str(json).unwrap_or_else(|_| address());
        assert_eq!(a.country, "India");
    }
}
