//! Order listing.

use axum::{
    Json,
    extract::{Query, State},
};
use tracing::instrument;

use quillhouse_commerce::db::OrderRepository;
use quillhouse_commerce::models::Order;

use super::types::OrdersQuery;
use crate::error::Result;
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

/// All orders, newest first, optionally filtered by status.
#[instrument(skip(state, _admin))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(query): Query<OrdersQuery>,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool())
        .list(query.status, query.page)
        .await?;
    Ok(Json(orders))
}
