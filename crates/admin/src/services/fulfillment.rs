//! Shipment booking through Shiprocket.
//!
//! Booking is two calls: create the adhoc order, then assign an AWB. The
//! shipment is stored after each step, so a failed AWB assignment can be
//! retried without creating a second Shiprocket order.

use quillhouse_commerce::db::OrderRepository;
use quillhouse_commerce::db::orders::ShipmentRecord;
use quillhouse_commerce::models::Order;
use quillhouse_commerce::shiprocket::{AdhocOrder, ShiprocketClient, ShiprocketError};
use quillhouse_core::{OrderStatus, PaymentStatus};
use sqlx::PgPool;

use crate::error::AppError;

/// Check that an order may be booked with the courier.
///
/// # Errors
///
/// Returns `AppError::Conflict` if the order is not paid and awaiting
/// dispatch, or already has an AWB.
pub fn ensure_bookable(order: &Order) -> Result<(), AppError> {
    if !matches!(order.status, OrderStatus::Placed | OrderStatus::Processing) {
        return Err(AppError::Conflict(format!(
            "Order is {} and cannot be shipped",
            order.status
        )));
    }
    if order.payment_status != PaymentStatus::Paid {
        return Err(AppError::Conflict(format!(
            "Order payment is {}",
            order.payment_status
        )));
    }
    if let Some(awb) = &order.awb_code {
        return Err(AppError::Conflict(format!("Order already shipped with AWB {awb}")));
    }
    Ok(())
}

/// Book a shipment for the print lines of `order` and return the order
/// as stored afterwards.
///
/// # Errors
///
/// Returns `AppError::Shipping` if Shiprocket rejects either call, and
/// `AppError::Conflict` if the order is not bookable.
pub async fn book_shipment(
    pool: &PgPool,
    shiprocket: &ShiprocketClient,
    order: &Order,
    customer_email: &str,
    pickup_location: &str,
) -> Result<Order, AppError> {
    ensure_bookable(order)?;
    let orders = OrderRepository::new(pool);

    let (shiprocket_order_id, shipment_id) = match (order.shiprocket_order_id, order.shipment_id) {
        (Some(sr_order), Some(shipment)) => (sr_order, shipment),
        _ => {
            let adhoc = AdhocOrder::from_order(order, customer_email, pickup_location)?;
            let created = shiprocket.create_order(&adhoc).await?;
            orders
                .set_shipment(
                    order.id,
                    &ShipmentRecord {
                        shiprocket_order_id: created.order_id,
                        shipment_id: created.shipment_id,
                        awb_code: None,
                        courier_name: None,
                    },
                )
                .await?;
            tracing::info!(
                order = %order.order_number,
                shipment_id = created.shipment_id,
                "Shiprocket order created"
            );
            (created.order_id, created.shipment_id)
        }
    };

    let awb = shiprocket.assign_awb(shipment_id).await?;
    orders
        .set_shipment(
            order.id,
            &ShipmentRecord {
                shiprocket_order_id,
                shipment_id,
                awb_code: Some(&awb.awb_code),
                courier_name: Some(&awb.courier_name),
            },
        )
        .await?;
    tracing::info!(
        order = %order.order_number,
        awb = %awb.awb_code,
        courier = %awb.courier_name,
        "AWB assigned"
    );

    orders
        .get(order.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {}", order.order_number)))
}

/// Cancel the Shiprocket order of a cancelled order, if one was booked.
///
/// Failures are logged; the order is already cancelled locally.
pub async fn cancel_shipment(shiprocket: Option<&ShiprocketClient>, order: &Order) {
    let (Some(client), Some(sr_order)) = (shiprocket, order.shiprocket_order_id) else {
        return;
    };

    match client.cancel_orders(&[sr_order]).await {
        Ok(()) => tracing::info!(order = %order.order_number, "Shiprocket order cancelled"),
        Err(ShiprocketError::Api { status, message }) => tracing::warn!(
            order = %order.order_number,
            status,
            detail = %message,
            "Shiprocket refused the cancellation"
        ),
        Err(e) => tracing::error!(
            error = %e,
            order = %order.order_number,
            "Failed to cancel Shiprocket order"
        ),
    }
}
