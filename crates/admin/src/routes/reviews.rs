//! Review moderation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use quillhouse_commerce::db::ReviewRepository;
use quillhouse_core::ReviewId;

use crate::error::Result;
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
pub async fn delete(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<ReviewId>,
) -> Result<StatusCode> {
    ReviewRepository::new(state.pool()).delete(id).await?;
    tracing::info!(review_id = %id, "Review removed");
    Ok(StatusCode::NO_CONTENT)
}
