//! CLI command implementations.

pub mod migrate;
pub mod seed;
pub mod subscriptions;
pub mod user;

use quillhouse_commerce::db::{RepositoryError, create_pool};
use quillhouse_commerce::password::PasswordError;
use quillhouse_core::{EmailError, ParseEnumError};
use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors from any CLI command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{0}")]
    Repository(#[from] RepositoryError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Invalid role: {0}")]
    InvalidRole(#[from] ParseEnumError),

    #[error("Invalid password: {0}")]
    Password(#[from] PasswordError),

    #[error("Could not read password: {0}")]
    Io(#[from] std::io::Error),

    /// No account has this email.
    #[error("No account with email {0}")]
    UnknownUser(String),
}

/// Connect using `DATABASE_URL`.
async fn connect() -> Result<PgPool, CommandError> {
    let url = std::env::var("DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(create_pool(&url).await?)
}
