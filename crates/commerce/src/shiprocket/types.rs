//! Shiprocket request and response types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::order::Order;

use super::ShiprocketError;

/// Packed dimensions of one printed book.
const BOOK_WEIGHT_KG: Decimal = Decimal::from_parts(5, 0, 0, false, 1);
const BOOK_LENGTH_CM: u32 = 22;
const BOOK_BREADTH_CM: u32 = 15;
const BOOK_HEIGHT_CM: u32 = 3;

/// Body of `POST /orders/create/adhoc`.
#[derive(Debug, Clone, Serialize)]
pub struct AdhocOrder {
    pub order_id: String,
    /// `YYYY-MM-DD HH:MM`
    pub order_date: String,
    pub pickup_location: String,
    pub billing_customer_name: String,
    pub billing_last_name: String,
    pub billing_address: String,
    pub billing_address_2: String,
    pub billing_city: String,
    pub billing_pincode: String,
    pub billing_state: String,
    pub billing_country: String,
    pub billing_email: String,
    pub billing_phone: String,
    pub shipping_is_billing: bool,
    pub order_items: Vec<AdhocOrderItem>,
    pub payment_method: &'static str,
    pub sub_total: Decimal,
    pub length: u32,
    pub breadth: u32,
    pub height: u32,
    pub weight: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdhocOrderItem {
    pub name: String,
    pub sku: String,
    pub units: i32,
    pub selling_price: Decimal,
}

impl AdhocOrder {
    /// Build a prepaid shipment for the print lines of a paid order.
    ///
    /// # Errors
    ///
    /// Returns `ShiprocketError::NotShippable` if the order has no print lines
    /// or no shipping address.
    pub fn from_order(
        order: &Order,
        customer_email: &str,
        pickup_location: &str,
    ) -> Result<Self, ShiprocketError> {
        let address = order
            .shipping_address
            .as_ref()
            .ok_or_else(|| ShiprocketError::NotShippable("order has no shipping address".to_owned()))?;

        let order_items: Vec<AdhocOrderItem> = order
            .items
            .iter()
            .filter(|item| item.format.is_physical())
            .map(|item| AdhocOrderItem {
                name: item.title.clone(),
                sku: format!("BOOK-{}", item.book_id),
                units: item.quantity,
                selling_price: item.unit_price.amount,
            })
            .collect();

        if order_items.is_empty() {
            return Err(ShiprocketError::NotShippable(
                "order has no print items".to_owned(),
            ));
        }

        let units: i32 = order_items.iter().map(|item| item.units).sum();
        let sub_total: Decimal = order_items
            .iter()
            .map(|item| item.selling_price * Decimal::from(item.units))
            .sum();
        let (first_name, last_name) = split_name(&address.name);
        let placed = order.placed_at.unwrap_or(order.created_at);

        Ok(Self {
            order_id: order.order_number.clone(),
            order_date: placed.format("%Y-%m-%d %H:%M").to_string(),
            pickup_location: pickup_location.to_owned(),
            billing_customer_name: first_name.to_owned(),
            billing_last_name: last_name.to_owned(),
            billing_address: address.line1.clone(),
            billing_address_2: address.line2.clone().unwrap_or_default(),
            billing_city: address.city.clone(),
            billing_pincode: address.pincode.clone(),
            billing_state: address.state.clone(),
            billing_country: address.country.clone(),
            billing_email: customer_email.to_owned(),
            billing_phone: address.phone.clone(),
            shipping_is_billing: true,
            order_items,
            payment_method: "Prepaid",
            sub_total,
            length: BOOK_LENGTH_CM,
            breadth: BOOK_BREADTH_CM,
            height: BOOK_HEIGHT_CM * u32::try_from(units.max(1)).unwrap_or(1),
            weight: BOOK_WEIGHT_KG * Decimal::from(units.max(1)),
        })
    }
}

fn split_name(full: &str) -> (&str, &str) {
    let full = full.trim();
    full.split_once(' ')
        .map_or((full, ""), |(first, last)| (first, last.trim()))
}

/// Response of `POST /orders/create/adhoc`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedShipment {
    pub order_id: i64,
    pub shipment_id: i64,
    #[serde(default)]
    pub status: Option<String>,
}

/// Courier and tracking number for a shipment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwbAssignment {
    pub awb_code: String,
    pub courier_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AwbResponse {
    #[serde(default)]
    pub awb_assign_status: i32,
    #[serde(default)]
    pub response: Option<AwbResponseBody>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AwbResponseBody {
    pub data: AwbAssignment,
}

/// Current state of a shipment.
#[derive(Debug, Clone, Serialize)]
pub struct Tracking {
    pub awb_code: String,
    pub current_status: Option<String>,
    pub track_url: Option<String>,
    pub activities: Vec<TrackingActivity>,
}

/// One scan event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingActivity {
    pub date: String,
    #[serde(default, rename = "sr-status-label")]
    pub status: Option<String>,
    pub activity: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TrackingResponse {
    pub tracking_data: TrackingData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TrackingData {
    #[serde(default)]
    pub shipment_track: Vec<ShipmentTrack>,
    #[serde(default)]
    pub shipment_track_activities: Option<Vec<TrackingActivity>>,
    #[serde(default)]
    pub track_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ShipmentTrack {
    #[serde(default)]
    pub current_status: Option<String>,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use quillhouse_core::{
        AuthorId, BookFormat, BookId, Money, OrderId, OrderItemId, OrderStatus, PaymentStatus,
        UserId,
    };

    use super::*;
    use crate::models::order::{OrderItem, ShippingAddress};

    fn item(id: i32, format: BookFormat, quantity: i32) -> OrderItem {
        OrderItem {
            id: OrderItemId::new(id),
            order_id: OrderId::new(1),
            book_id: BookId::new(id),
            title: format!("Book {id}"),
            author_id: AuthorId::new(1),
            format,
            unit_price: Money::inr(Decimal::new(299, 0)),
            quantity,
        }
    }

    fn order(items: Vec<OrderItem>) -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::new(1),
            order_number: "QH-100001".to_owned(),
            user_id: UserId::new(1),
            status: OrderStatus::Placed,
            payment_status: PaymentStatus::Paid,
            subtotal: Money::inr(Decimal::new(897, 0)),
            discount: Money::zero(),
            shipping_fee: Money::zero(),
            total: Money::inr(Decimal::new(897, 0)),
            coupon_code: None,
            affiliate_code: None,
            shipping_address: Some(ShippingAddress {
                name: "Asha Rao Menon".to_owned(),
                phone: "9876543210".to_owned(),
                line1: "12 MG Road".to_owned(),
                line2: None,
                city: "Bengaluru".to_owned(),
                state: "Karnataka".to_owned(),
                pincode: "560001".to_owned(),
                country: "India".to_owned(),
            }),
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
            items,
        }
    }

    #[test]
    fn test_adhoc_order_ships_only_print_lines() {
        let order = order(vec![
            item(1, BookFormat::Print, 2),
            item(2, BookFormat::Ebook, 1),
        ]);

        let adhoc = AdhocOrder::from_order(&order, "asha@example.com", "Primary").expect("shippable");

        assert_eq!(adhoc.order_id, "QH-100001");
        assert_eq!(adhoc.order_items.len(), 1);
        assert_eq!(adhoc.sub_total, Decimal::new(598, 0));
        assert_eq!(adhoc.weight, Decimal::new(10, 1));
        assert_eq!(adhoc.height, 6);
        assert_eq!(adhoc.billing_customer_name, "Asha");
        assert_eq!(adhoc.billing_last_name, "Rao Menon");
        assert_eq!(adhoc.payment_method, "Prepaid");
    }

    #[test]
    fn test_ebook_only_order_is_not_shippable() {
        let order = order(vec![item(2, BookFormat::Ebook, 1)]);
        let result = AdhocOrder::from_order(&order, "asha@example.com", "Primary");
        assert!(matches!(result, Err(ShiprocketError::NotShippable(_))));
    }

    #[test]
    fn test_order_without_address_is_not_shippable() {
        let mut order = order(vec![item(1, BookFormat::Print, 1)]);
        order.shipping_address = None;
        let result = AdhocOrder::from_order(&order, "asha@example.com", "Primary");
        assert!(matches!(result, Err(ShiprocketError::NotShippable(_))));
    }

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("Asha"), ("Asha", ""));
        assert_eq!(split_name(" Asha Rao "), ("Asha", "Rao"));
    }
}
