//! Payment and refund ledger.

use axum::{
    Json,
    extract::{Query, State},
};
use tracing::instrument;

use quillhouse_commerce::db::TransactionRepository;
use quillhouse_commerce::models::{Transaction, TransactionFilter};

use crate::error::Result;
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

/// Newest first; filter with `?kind=payment|refund` or `?order_id=`.
#[instrument(skip(_admin, state))]
pub async fn index(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(filter): Query<TransactionFilter>,
) -> Result<Json<Vec<Transaction>>> {
    Ok(Json(
        TransactionRepository::new(state.pool()).list(&filter).await?,
    ))
}
