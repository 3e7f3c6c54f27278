//! Account role management.
//!
//! Roles are normally changed through the back-office; these commands exist
//! to bootstrap the first admin and to recover access.

use quillhouse_commerce::db::{RepositoryError, UserRepository};
use quillhouse_commerce::models::NewUser;
use quillhouse_commerce::password::{hash_password, validate_password};
use quillhouse_core::{Email, UserRole};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{CommandError, connect};

/// Change the role of an existing account.
///
/// # Errors
///
/// Returns an error if the email or role is invalid, or no account matches.
pub async fn set_role(email: &str, role: &str) -> Result<(), CommandError> {
    let email = Email::parse(email)?;
    let role: UserRole = role.parse()?;

    let pool = connect().await?;
    let user = UserRepository::new(&pool)
        .set_role(&email, role)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => CommandError::UnknownUser(email.to_string()),
            other => other.into(),
        })?;

    tracing::info!(uid = %user.uid, email = %user.email, role = %user.role, "Role updated");
    Ok(())
}

/// Read one line from stdin, without the line ending.
async fn read_password() -> Result<String, CommandError> {
    tracing::info!("Reading password from stdin");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

/// Create an admin account, or promote and reset the password of an
/// existing one.
///
/// # Errors
///
/// Returns an error if the email or password is invalid or the database
/// write fails.
pub async fn create_admin(email: &str, name: Option<&str>) -> Result<(), CommandError> {
    let email = Email::parse(email)?;
    let password = read_password().await?;
    validate_password(&password)?;
    let password_hash = hash_password(&password)?;

    let pool = connect().await?;
    let users = UserRepository::new(&pool);

    if let Some(existing) = users.get_by_email(&email).await? {
        users.set_password(existing.id, &password_hash).await?;
        let user = users.set_role(&email, UserRole::Admin).await?;
        tracing::info!(uid = %user.uid, email = %user.email, "Existing account promoted to admin");
        return Ok(());
    }

    let user = users
        .create(&NewUser {
            email: &email,
            display_name: name,
            phone: None,
            role: UserRole::Admin,
            password_hash: &password_hash,
        })
        .await?;

    tracing::info!(uid = %user.uid, email = %user.email, "Admin account created");
    Ok(())
}
