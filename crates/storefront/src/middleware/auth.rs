//! Authentication extractors.
//!
//! The storefront is a JSON API: rejections are plain 401/403 responses.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use quillhouse_commerce::db::UserRepository;
use quillhouse_commerce::models::UserAccount;

use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Extractor that requires a logged-in user.
///
/// The account is re-read on every request, so a disabled or deleted
/// account loses access immediately and role changes apply without a new
/// login.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires a user allowed to use the author portal.
pub struct RequireAuthor(pub CurrentUser);

/// Extractor that optionally gets the current user.
pub struct OptionalAuth(pub Option<CurrentUser>);

/// Rejection for the auth extractors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    Unauthorized,
    Disabled,
    NotAnAuthor,
    Internal,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Login required").into_response(),
            Self::Disabled => {
                (StatusCode::FORBIDDEN, "This account has been disabled").into_response()
            }
            Self::NotAnAuthor => {
                (StatusCode::FORBIDDEN, "Author profile required").into_response()
            }
            Self::Internal => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

/// Session identity checked against the stored account.
///
/// Returns the identity rebuilt from the account, so role and name follow
/// the database rather than the session.
fn verify_account(account: Option<&UserAccount>) -> Result<CurrentUser, AuthRejection> {
    match account {
        None => Err(AuthRejection::Unauthorized),
        Some(account) if account.disabled => Err(AuthRejection::Disabled),
        Some(account) => Ok(CurrentUser::from(account)),
    }
}

/// The logged-in user, if the session holds one whose account is still usable.
async fn current_user(parts: &Parts, state: &AppState) -> Result<CurrentUser, AuthRejection> {
    let session = parts
        .extensions
        .get::<Session>()
        .ok_or(AuthRejection::Unauthorized)?;

    let cached = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
        .ok_or(AuthRejection::Unauthorized)?;

    let account = UserRepository::new(state.pool())
        .get_by_id(cached.id)
        .await
        .map_err(|e| {
            tracing::error!(user_id = %cached.id, error = %e, "Failed to load session account");
            AuthRejection::Internal
        })?;

    let user = verify_account(account.as_ref());
    if let Err(rejection) = &user {
        tracing::info!(user_id = %cached.id, ?rejection, "Ending session for unusable account");
        if let Err(e) = clear_current_user(session).await {
            tracing::warn!(error = %e, "Failed to clear session");
        }
    }
    user
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        current_user(parts, state).await.map(Self)
    }
}

impl FromRequestParts<AppState> for RequireAuthor {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = current_user(parts, state).await?;

        if !user.role.can_publish() {
            return Err(AuthRejection::NotAnAuthor);
        }

        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(current_user(parts, state).await.ok()))
    }
}

/// Store the logged-in user in the session.
///
/// The session id is cycled first so a pre-login id can't be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Remove the logged-in user from the session, keeping the cart.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use quillhouse_core::{Email, UserId, UserRole};
    use uuid::Uuid;

    use super::*;

    fn account(role: UserRole, disabled: bool) -> UserAccount {
        UserAccount {
            id: UserId::new(11),
            uid: Uuid::nil(),
            email: Email::parse("reader@quillhouse.in").unwrap(),
            display_name: Some("Meera".to_string()),
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
    fn test_disabled_account_is_rejected() {
        let rejection = verify_account(Some(&account(UserRole::Customer, true))).unwrap_err();
        assert_eq!(rejection, AuthRejection::Disabled);
        assert_eq!(rejection.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_deleted_account_is_rejected() {
        let rejection = verify_account(None).unwrap_err();
        assert_eq!(rejection, AuthRejection::Unauthorized);
        assert_eq!(rejection.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_role_comes_from_account() {
        let user = verify_account(Some(&account(UserRole::Author, false))).unwrap();
        assert_eq!(user.id, UserId::new(11));
        assert_eq!(user.role, UserRole::Author);
        assert_eq!(user.name.as_deref(), Some("Meera"));
    }
}
