//! Single order action handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use quillhouse_commerce::db::{OrderRepository, UserRepository};
use quillhouse_commerce::models::Order;
use quillhouse_commerce::refunds;
use quillhouse_core::{Money, OrderId, OrderStatus, UserId};

use super::detail::load_order;
use super::types::{CancelInput, CancellationView, RefundInput, RefundView, StatusInput};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::services::fulfillment;
use crate::state::AppState;

/// Statuses an admin may set directly. The rest are reached through
/// payment capture, cancellation or refund.
const fn is_manual_status(status: OrderStatus) -> bool {
    matches!(
        status,
        OrderStatus::Processing | OrderStatus::Shipped | OrderStatus::Delivered
    )
}

/// Email address and greeting name of an order's buyer.
async fn recipient(state: &AppState, user_id: UserId) -> Result<Option<(String, String)>> {
    Ok(UserRepository::new(state.pool())
        .get_by_id(user_id)
        .await?
        .map(|user| {
            let name = user
                .display_name
                .clone()
                .unwrap_or_else(|| user.email.local_part().to_owned());
            (user.email.into_inner(), name)
        }))
}

/// Move an order along the fulfilment path.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(id): Path<OrderId>,
    Json(body): Json<StatusInput>,
) -> Result<Json<Order>> {
    let order = load_order(&state, id).await?;
    let next = body.status;

    if !is_manual_status(next) {
        return Err(AppError::BadRequest(format!(
            "Status {next} cannot be set directly"
        )));
    }
    if !order.status.can_transition_to(next) {
        return Err(AppError::Conflict(format!(
            "Order cannot move from {} to {next}",
            order.status
        )));
    }

    let orders = OrderRepository::new(state.pool());
    orders.update_status(id, order.status, next).await?;
    tracing::info!(order = %order.order_number, from = %order.status, to = %next, "Order status changed");

    let updated = load_order(&state, id).await?;

    if next == OrderStatus::Shipped {
        if let Some((email, name)) = recipient(&state, updated.user_id).await? {
            state.mailer().order_shipped(&email, &name, &updated).await;
        }
    }

    Ok(Json(updated))
}

/// Cancel an order and refund whatever was paid.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(id): Path<OrderId>,
    body: Option<Json<CancelInput>>,
) -> Result<Json<CancellationView>> {
    let order = load_order(&state, id).await?;
    let reason = body.and_then(|Json(b)| b.reason).filter(|r| !r.trim().is_empty());

    let outcome = refunds::cancel_order(
        state.pool(),
        state.razorpay(),
        &order,
        reason.as_deref(),
        false,
    )
    .await?;

    fulfillment::cancel_shipment(state.shiprocket().ok(), &order).await;

    let cancelled = load_order(&state, id).await?;
    let refunded: Option<Money> = outcome.as_ref().map(|o| o.amount);
    if let Some((email, name)) = recipient(&state, cancelled.user_id).await? {
        state
            .mailer()
            .order_cancelled(&email, &name, &cancelled, refunded)
            .await;
    }

    Ok(Json(CancellationView {
        order: cancelled,
        refund: outcome.map(Into::into),
    }))
}

/// Refund part or all of a paid order.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn refund(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(id): Path<OrderId>,
    Json(body): Json<RefundInput>,
) -> Result<Json<RefundView>> {
    let order = load_order(&state, id).await?;

    if body.amount.is_some_and(|amount| amount <= rust_decimal::Decimal::ZERO) {
        return Err(AppError::BadRequest(
            "Refund amount must be positive".to_string(),
        ));
    }

    let outcome = refunds::refund_order(
        state.pool(),
        state.razorpay(),
        &order,
        body.amount.map(Money::inr),
        body.note.as_deref(),
    )
    .await?;

    Ok(Json(outcome.into()))
}

/// Book the order's print lines with Shiprocket and assign an AWB.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn create_shipment(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = load_order(&state, id).await?;
    fulfillment::ensure_bookable(&order)?;
    let shiprocket = state.shiprocket()?;

    let (email, _) = recipient(&state, order.user_id)
        .await?
        .ok_or_else(|| AppError::Conflict("Order's customer no longer exists".to_string()))?;

    let shipped = fulfillment::book_shipment(
        state.pool(),
        shiprocket,
        &order,
        &email,
        state.pickup_location(),
    )
    .await?;

    Ok(Json(shipped))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_statuses() {
        assert!(is_manual_status(OrderStatus::Processing));
        assert!(is_manual_status(OrderStatus::Shipped));
        assert!(is_manual_status(OrderStatus::Delivered));
        assert!(!is_manual_status(OrderStatus::Placed));
        assert!(!is_manual_status(OrderStatus::Cancelled));
        assert!(!is_manual_status(OrderStatus::Refunded));
    }
}
