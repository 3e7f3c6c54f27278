//! Publisher news posts.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use quillhouse_commerce::db::UpdateRepository;
use quillhouse_commerce::models::{Update, UpdateInput};
use quillhouse_core::UpdateId;

use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

fn validate(input: &UpdateInput) -> Result<()> {
    if input.title.trim().is_empty() {
        return Err(AppError::BadRequest("Title is required".to_string()));
    }
    Ok(())
}

/// Drafts and published posts.
#[instrument(skip(_admin, state))]
pub async fn index(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<Update>>> {
    Ok(Json(UpdateRepository::new(state.pool()).list(false).await?))
}

#[instrument(skip(admin, state, input), fields(admin_id = %admin.id))]
pub async fn create(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Json(input): Json<UpdateInput>,
) -> Result<(StatusCode, Json<Update>)> {
    validate(&input)?;
    let update = UpdateRepository::new(state.pool()).create(&input).await?;
    Ok((StatusCode::CREATED, Json(update)))
}

#[instrument(skip(admin, state, input), fields(admin_id = %admin.id))]
pub async fn update(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<UpdateId>,
    Json(input): Json<UpdateInput>,
) -> Result<Json<Update>> {
    validate(&input)?;
    Ok(Json(
        UpdateRepository::new(state.pool()).update(id, &input).await?,
    ))
}

#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
pub async fn delete(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<UpdateId>,
) -> Result<StatusCode> {
    UpdateRepository::new(state.pool()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
