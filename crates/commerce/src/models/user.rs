//! User account domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use quillhouse_core::{Email, UserId, UserRole};

/// A user account (customer, author or admin).
#[derive(Debug, Clone, Serialize)]
pub struct UserAccount {
    pub id: UserId,
    /// Public identifier used by the user-management API.
    pub uid: Uuid,
    pub email: Email,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub role: UserRole,
    /// Disabled accounts cannot sign in.
    pub disabled: bool,
    pub email_verified: bool,
    pub last_sign_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data needed to register an account.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a Email,
    pub display_name: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub role: UserRole,
    pub password_hash: &'a str,
}
