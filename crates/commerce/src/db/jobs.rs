//! Job listing and application repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use quillhouse_core::{ApplicationId, ApplicationStatus, JobId};

use super::RepositoryError;
use crate::models::content::{Job, JobApplication, JobInput, NewApplication};

const JOB_COLUMNS: &str =
    "id, title, department, location, employment_type, description, open, created_at";

const APPLICATION_COLUMNS: &str =
    "id, job_id, name, email, phone, resume_url, cover_letter, status, created_at";

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: i32,
    title: String,
    department: String,
    location: String,
    employment_type: String,
    description: String,
    open: bool,
    created_at: DateTime<Utc>,
}

impl From<JobRow> for Job {
    fn from(row: JobRow) -> Self {
        Self {
            id: JobId::new(row.id),
            title: row.title,
            department: row.department,
            location: row.location,
            employment_type: row.employment_type,
            description: row.description,
            open: row.open,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ApplicationRow {
    id: i32,
    job_id: i32,
    name: String,
    email: String,
    phone: Option<String>,
    resume_url: String,
    cover_letter: Option<String>,
    status: ApplicationStatus,
    created_at: DateTime<Utc>,
}

impl From<ApplicationRow> for JobApplication {
    fn from(row: ApplicationRow) -> Self {
        Self {
            id: ApplicationId::new(row.id),
            job_id: JobId::new(row.job_id),
            name: row.name,
            email: row.email,
            phone: row.phone,
            resume_url: row.resume_url,
            cover_letter: row.cover_letter,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

/// Repository for jobs and applications.
pub struct JobRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> JobRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Jobs, newest first. `open_only` hides closed positions.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, open_only: bool) -> Result<Vec<Job>, RepositoryError> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM shop.job WHERE open OR NOT $1 ORDER BY created_at DESC"
        ))
        .bind(open_only)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a job.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: JobId) -> Result<Option<Job>, RepositoryError> {
        let row = sqlx::query_as::<_, JobRow>(&format!("SELECT {JOB_COLUMNS} FROM shop.job WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Create a job.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, input: &JobInput) -> Result<Job, RepositoryError> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            r"
            INSERT INTO shop.job (title, department, location, employment_type, description, open)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {JOB_COLUMNS}
            "
        ))
        .bind(&input.title)
        .bind(&input.department)
        .bind(&input.location)
        .bind(&input.employment_type)
        .bind(&input.description)
        .bind(input.open)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Replace a job.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the job doesn't exist.
    pub async fn update(&self, id: JobId, input: &JobInput) -> Result<Job, RepositoryError> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            r"
            UPDATE shop.job
            SET title = $2, department = $3, location = $4, employment_type = $5,
                description = $6, open = $7
            WHERE id = $1
            RETURNING {JOB_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&input.title)
        .bind(&input.department)
        .bind(&input.location)
        .bind(&input.employment_type)
        .bind(&input.description)
        .bind(input.open)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Delete a job and its applications.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the job doesn't exist.
    pub async fn delete(&self, id: JobId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.job WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Store an application.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn apply(&self, job_id: JobId, new: &NewApplication) -> Result<JobApplication, RepositoryError> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            r"
            INSERT INTO shop.job_application (job_id, name, email, phone, resume_url, cover_letter)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {APPLICATION_COLUMNS}
            "
        ))
        .bind(job_id)
        .bind(&new.name)
        .bind(&new.email)
        .bind(new.phone.as_deref())
        .bind(&new.resume_url)
        .bind(new.cover_letter.as_deref())
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Applications for a job, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_applications(&self, job_id: JobId) -> Result<Vec<JobApplication>, RepositoryError> {
        let rows = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM shop.job_application WHERE job_id = $1 ORDER BY created_at DESC"
        ))
        .bind(job_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Move an application to a new review status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the application doesn't exist.
    pub async fn set_application_status(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> Result<JobApplication, RepositoryError> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "UPDATE shop.job_application SET status = $2 WHERE id = $1 RETURNING {APPLICATION_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }
}
