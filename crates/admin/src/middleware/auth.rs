//! Authentication extractors for admin.
//!
//! Back-office routes reject with plain-text 401s; the user-management
//! routes reject with their JSON error body.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use quillhouse_commerce::db::{RepositoryError, UserRepository};
use quillhouse_commerce::models::UserAccount;
use quillhouse_core::UserRole;

use crate::error::ApiError;
use crate::models::{CurrentAdmin, session_keys};
use crate::state::AppState;

/// Extractor that requires admin authentication.
///
/// The account behind the session is re-read on every request; the session
/// ends as soon as the account is disabled, deleted or loses the admin role.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAdminAuth(admin): RequireAdminAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", admin.name)
/// }
/// ```
pub struct RequireAdminAuth(pub CurrentAdmin);

/// Like [`RequireAdminAuth`], for the user-management API.
pub struct RequireAdminApi(pub CurrentAdmin);

/// Extractor that optionally gets the current admin.
pub struct OptionalAdminAuth(pub Option<CurrentAdmin>);

/// Error returned when admin authentication is required but missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAuthRejection {
    Unauthenticated,
    Internal,
}

impl IntoResponse for AdminAuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "Admin login required").into_response()
            }
            Self::Internal => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

/// Admin identity for an account, if it may still use the back-office.
fn admin_identity(account: Option<&UserAccount>) -> Option<CurrentAdmin> {
    account
        .filter(|account| account.role == UserRole::Admin && !account.disabled)
        .map(CurrentAdmin::from)
}

async fn current_admin(
    parts: &Parts,
    state: &AppState,
) -> Result<Option<CurrentAdmin>, RepositoryError> {
    let Some(session) = parts.extensions.get::<Session>() else {
        return Ok(None);
    };
    let Some(cached) = session
        .get::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
        .await
        .ok()
        .flatten()
    else {
        return Ok(None);
    };

    let account = UserRepository::new(state.pool()).get_by_id(cached.id).await?;
    let admin = admin_identity(account.as_ref());

    if admin.is_none() {
        tracing::warn!(user_id = %cached.id, "Ending admin session for revoked account");
        if let Err(e) = clear_current_admin(session).await {
            tracing::warn!(error = %e, "Failed to clear admin session");
        }
    }
    Ok(admin)
}

impl FromRequestParts<AppState> for RequireAdminAuth {
    type Rejection = AdminAuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match current_admin(parts, state).await {
            Ok(Some(admin)) => Ok(Self(admin)),
            Ok(None) => Err(AdminAuthRejection::Unauthenticated),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load admin account");
                Err(AdminAuthRejection::Internal)
            }
        }
    }
}

impl FromRequestParts<AppState> for RequireAdminApi {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        current_admin(parts, state)
            .await
            .map_err(|e| ApiError::internal("Failed to verify admin session", &e))?
            .map(Self)
            .ok_or_else(ApiError::unauthorized)
    }
}

impl FromRequestParts<AppState> for OptionalAdminAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(current_admin(parts, state).await.ok().flatten()))
    }
}

/// Store the logged-in admin in the session, cycling the session id.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_admin(
    session: &Session,
    admin: &CurrentAdmin,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_ADMIN, admin).await
}

/// End the admin session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be deleted.
pub async fn clear_current_admin(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use quillhouse_core::{Email, UserId};
    use uuid::Uuid;

    use super::*;

    fn account(role: UserRole, disabled: bool) -> UserAccount {
        UserAccount {
            id: UserId::new(3),
            uid: Uuid::nil(),
            email: Email::parse("ops@quillhouse.in").unwrap(),
            display_name: None,
            phone: None,
            role,
            disabled,
            email_verified: true,
            last_sign_in_at: None,
            created_at: DateTime::UNIX_EPOCH,
            updated_at: DateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_active_admin_keeps_access() {
        let admin = admin_identity(Some(&account(UserRole::Admin, false))).unwrap();
        assert_eq!(admin.id, UserId::new(3));
        assert_eq!(admin.name, "ops@quillhouse.in");
    }

    #[test]
    fn test_revoked_accounts_lose_access() {
        assert!(admin_identity(Some(&account(UserRole::Admin, true))).is_none());
        assert!(admin_identity(Some(&account(UserRole::Customer, false))).is_none());
        assert!(admin_identity(None).is_none());
    }
}
