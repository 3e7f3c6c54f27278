//! Job postings and applications.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use quillhouse_commerce::db::JobRepository;
use quillhouse_commerce::models::{Job, JobApplication, JobInput};
use quillhouse_core::{ApplicationId, ApplicationStatus, JobId};

use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ApplicationStatusInput {
    pub status: ApplicationStatus,
}

fn validate(input: &JobInput) -> Result<()> {
    if input.title.trim().is_empty() || input.description.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Title and description are required".to_string(),
        ));
    }
    Ok(())
}

#[instrument(skip(_admin, state))]
pub async fn index(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<Job>>> {
    Ok(Json(JobRepository::new(state.pool()).list(false).await?))
}

#[instrument(skip(admin, state, input), fields(admin_id = %admin.id))]
pub async fn create(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Json(input): Json<JobInput>,
) -> Result<(StatusCode, Json<Job>)> {
    validate(&input)?;
    let job = JobRepository::new(state.pool()).create(&input).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

#[instrument(skip(admin, state, input), fields(admin_id = %admin.id))]
pub async fn update(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<JobId>,
    Json(input): Json<JobInput>,
) -> Result<Json<Job>> {
    validate(&input)?;
    Ok(Json(JobRepository::new(state.pool()).update(id, &input).await?))
}

/// Applications are removed along with the posting.
#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
pub async fn delete(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<JobId>,
) -> Result<StatusCode> {
    JobRepository::new(state.pool()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(_admin, state))]
pub async fn applications(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<JobId>,
) -> Result<Json<Vec<JobApplication>>> {
    let repo = JobRepository::new(state.pool());
    if repo.get(id).await?.is_none() {
        return Err(AppError::NotFound(format!("job {id}")));
    }
    Ok(Json(repo.list_applications(id).await?))
}

#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
pub async fn set_application_status(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<ApplicationId>,
    Json(input): Json<ApplicationStatusInput>,
) -> Result<Json<JobApplication>> {
    let application = JobRepository::new(state.pool())
        .set_application_status(id, input.status)
        .await?;
    tracing::info!(application_id = %id, status = %input.status, "Application status changed");
    Ok(Json(application))
}
