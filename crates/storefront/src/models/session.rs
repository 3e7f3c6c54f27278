//! Session-related types.
//!
//! Types stored in the session for authentication and cart state.

use serde::{Deserialize, Serialize};

use quillhouse_commerce::models::UserAccount;
use quillhouse_core::{Email, UserId, UserRole};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Role at login time.
    pub role: UserRole,
    /// Display name, if set.
    pub name: Option<String>,
}

impl CurrentUser {
    /// Name to greet the user with.
    #[must_use]
    pub fn greeting_name(&self) -> &str {
        self.name
            .as_deref()
            .unwrap_or_else(|| self.email.local_part())
    }
}

impl From<&UserAccount> for CurrentUser {
    fn from(user: &UserAccount) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
            name: user.display_name.clone(),
        }
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the customer's cart.
    pub const CART: &str = "cart";

    /// Key for the affiliate code of the link the visitor arrived through.
    pub const AFFILIATE_CODE: &str = "affiliate_code";
}
