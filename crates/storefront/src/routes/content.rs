//! Banners, announcements and careers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use quillhouse_commerce::db::{BannerRepository, JobRepository, UpdateRepository};
use quillhouse_commerce::models::{Banner, Job, JobApplication, NewApplication, Update};
use quillhouse_core::{Email, JobId};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Job application body.
#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub resume_url: String,
    pub cover_letter: Option<String>,
}

impl ApplyRequest {
    fn validate(self) -> Result<NewApplication> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("Name is required".to_string()));
        }

        let email = Email::parse(&self.email)
            .map_err(|e| AppError::BadRequest(format!("Invalid email: {e}")))?;

        let resume_url = self.resume_url.trim();
        let is_url = url::Url::parse(resume_url)
            .is_ok_and(|u| matches!(u.scheme(), "http" | "https"));
        if !is_url {
            return Err(AppError::BadRequest(
                "Resume must be an http(s) link".to_string(),
            ));
        }

        Ok(NewApplication {
            name: name.to_owned(),
            email,
            phone: self.phone.filter(|p| !p.trim().is_empty()),
            resume_url: resume_url.to_owned(),
            cover_letter: self.cover_letter.filter(|c| !c.trim().is_empty()),
        })
    }
}

/// Hero banners currently live.
#[instrument(skip(state))]
pub async fn banners(State(state): State<AppState>) -> Result<Json<Vec<Banner>>> {
    Ok(Json(BannerRepository::new(state.pool()).list_live().await?))
}

/// Published announcements.
#[instrument(skip(state))]
pub async fn updates(State(state): State<AppState>) -> Result<Json<Vec<Update>>> {
    Ok(Json(UpdateRepository::new(state.pool()).list(true).await?))
}

/// Open positions.
#[instrument(skip(state))]
pub async fn jobs(State(state): State<AppState>) -> Result<Json<Vec<Job>>> {
    Ok(Json(JobRepository::new(state.pool()).list(true).await?))
}

/// Apply to an open position and email a receipt.
#[instrument(skip(state, body))]
pub async fn apply(
    State(state): State<AppState>,
    Path(id): Path<JobId>,
    Json(body): Json<ApplyRequest>,
) -> Result<(StatusCode, Json<JobApplication>)> {
    let application = body.validate()?;
    let jobs = JobRepository::new(state.pool());

    let job = jobs
        .get(id)
        .await?
        .filter(|j| j.open)
        .ok_or_else(|| AppError::NotFound(format!("Job {id}")))?;

    let created = jobs.apply(job.id, &application).await?;
    tracing::info!(job_id = %job.id, application_id = %created.id, "Job application received");

    state
        .mailer()
        .application_received(application.email.as_str(), &application.name, &job.title)
        .await;

    Ok((StatusCode::CREATED, Json(created)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ApplyRequest {
        ApplyRequest {
            name: " Meera ".to_owned(),
            email: "meera@example.com".to_owned(),
            phone: Some(String::new()),
            resume_url: "https://drive.example.com/cv.pdf".to_owned(),
            cover_letter: None,
        }
    }

    #[test]
    fn test_apply_request_normalizes() {
        let app = request().validate().unwrap();
        assert_eq!(app.name, "Meera");
        assert!(app.phone.is_none());
    }

    #[test]
    fn test_apply_request_rejects_bad_resume_link() {
        let mut req = request();
        req.resume_url = "javascript:alert(1)".to_owned();
        assert!(matches!(req.validate(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_apply_request_rejects_bad_email() {
        let mut req = request();
        req.email = "not-an-email".to_owned();
        assert!(req.validate().is_err());
    }
}
