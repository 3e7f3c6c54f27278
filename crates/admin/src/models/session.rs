//! Session-related types for admin authentication.

use serde::{Deserialize, Serialize};

use quillhouse_commerce::models::UserAccount;
use quillhouse_core::{Email, UserId};

/// Session-stored admin identity.
///
/// Only accounts with the `admin` role are ever stored here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentAdmin {
    /// Admin's user ID.
    pub id: UserId,
    /// Admin's email address.
    pub email: Email,
    /// Admin's display name, falling back to the email.
    pub name: String,
}

impl From<&UserAccount> for CurrentAdmin {
    fn from(user: &UserAccount) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user
                .display_name
                .clone()
                .unwrap_or_else(|| user.email.to_string()),
        }
    }
}

/// Session keys for admin authentication data.
pub mod keys {
    /// Key for storing the current logged-in admin.
    pub const CURRENT_ADMIN: &str = "current_admin";
}
