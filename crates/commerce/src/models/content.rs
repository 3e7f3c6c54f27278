//! Careers and announcements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quillhouse_core::{ApplicationId, ApplicationStatus, Email, JobId, UpdateId};

use super::marketing::default_true;

/// An open (or closed) position.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: JobId,
    pub title: String,
    pub department: String,
    pub location: String,
    pub employment_type: String,
    pub description: String,
    pub open: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobInput {
    pub title: String,
    pub department: String,
    pub location: String,
    #[serde(default = "default_employment_type")]
    pub employment_type: String,
    pub description: String,
    #[serde(default = "default_true")]
    pub open: bool,
}

fn default_employment_type() -> String {
    "full_time".to_owned()
}

/// A candidate's application.
#[derive(Debug, Clone, Serialize)]
pub struct JobApplication {
    pub id: ApplicationId,
    pub job_id: JobId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub resume_url: String,
    pub cover_letter: Option<String>,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
}

/// A validated application about to be stored.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub resume_url: String,
    pub cover_letter: Option<String>,
}

/// A news item shown on the storefront.
#[derive(Debug, Clone, Serialize)]
pub struct Update {
    pub id: UpdateId,
    pub title: String,
    pub body: String,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateInput {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub published: bool,
}
