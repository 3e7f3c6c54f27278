//! Database migrations.
//!
//! Migrations live in the workspace `migrations/` directory and are embedded
//! at compile time. They create the `shop` schema and the
//! `tower_sessions.session` table used by both servers.

use super::{CommandError, connect};

/// Apply every pending migration.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../../migrations").run(&pool).await?;

    tracing::info!("Migrations complete");
    Ok(())
}
