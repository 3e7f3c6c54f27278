//! Order detail and courier tracking.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use quillhouse_commerce::db::{OrderRepository, TransactionRepository, UserRepository};
use quillhouse_commerce::models::{Order, TransactionFilter};
use quillhouse_commerce::shiprocket::Tracking;
use quillhouse_core::OrderId;

use super::types::OrderDetailView;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

/// Load an order or fail with 404.
pub(super) async fn load_order(state: &AppState, id: OrderId) -> Result<Order> {
    OrderRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {id}")))
}

/// An order with its buyer and ledger.
#[instrument(skip(state, _admin))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetailView>> {
    let order = load_order(&state, id).await?;

    let customer = UserRepository::new(state.pool())
        .get_by_id(order.user_id)
        .await?
        .map(Into::into);
    let transactions = TransactionRepository::new(state.pool())
        .list(&TransactionFilter {
            order_id: Some(id),
            ..TransactionFilter::default()
        })
        .await?;
    let refunded = OrderRepository::new(state.pool())
        .refunded_total(id)
        .await?;

    Ok(Json(OrderDetailView {
        next_statuses: order.status.next_statuses(),
        order,
        customer,
        transactions,
        refunded,
    }))
}

/// Live tracking for the order's AWB.
#[instrument(skip(state, _admin))]
pub async fn tracking(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Tracking>> {
    let order = load_order(&state, id).await?;
    let awb = order
        .awb_code
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Order has no AWB yet".to_string()))?;

    Ok(Json(state.shiprocket()?.track_awb(awb).await?))
}
