//! Authentication service.
//!
//! Email and password accounts backed by `shop.user` / `shop.user_password`.

mod error;

pub use error::AuthError;

use sqlx::PgPool;

use quillhouse_commerce::db::{RepositoryError, UserRepository};
use quillhouse_commerce::models::{NewUser, UserAccount};
use quillhouse_commerce::password::{hash_password, validate_password, verify_password};
use quillhouse_core::{Email, UserRole};

/// Authentication service.
///
/// Handles customer registration and password login.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new customer with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register_with_password(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<UserAccount, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let display_name = display_name.map(str::trim).filter(|n| !n.is_empty());

        let user = self
            .users
            .create(&NewUser {
                email: &email,
                display_name,
                phone: None,
                role: UserRole::Customer,
                password_hash: &password_hash,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "Customer registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// The password is checked before the disabled flag so a disabled
    /// account does not reveal itself to someone guessing passwords.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    /// Returns `AuthError::AccountDisabled` if the account has been disabled.
    pub async fn login_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserAccount, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        if user.disabled {
            tracing::warn!(user_id = %user.id, "Login attempt on disabled account");
            return Err(AuthError::AccountDisabled);
        }

        self.users.record_sign_in(user.id).await?;

        Ok(user)
    }
}
