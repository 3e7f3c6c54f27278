//! Customer order history and cancellation.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tracing::instrument;

use quillhouse_commerce::db::OrderRepository;
use quillhouse_commerce::models::Order;
use quillhouse_core::OrderId;

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::services::orders::{self, Cancellation};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

/// The customer's orders, newest first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(
        OrderRepository::new(state.pool())
            .list_for_user(user.id)
            .await?,
    ))
}

/// One of the customer's orders with its items.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    OrderRepository::new(state.pool())
        .get_for_user(id, user.id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Order {id}")))
}

/// Cancel an order, refunding it in full if it was paid.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
    body: Option<Json<CancelRequest>>,
) -> Result<Json<Cancellation>> {
    let reason = body
        .and_then(|Json(b)| b.reason)
        .filter(|r| !r.trim().is_empty());

    let cancellation = orders::cancel(
        state.pool(),
        state.razorpay(),
        state.mailer(),
        &user,
        id,
        reason.as_deref(),
    )
    .await?;

    Ok(Json(cancellation))
}
