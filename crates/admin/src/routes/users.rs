//! User-management API.
//!
//! JSON endpoints used by the web frontend for privileged account
//! operations. Bodies follow `{success: true, ...}` on success and
//! `{success: false, message, error}` on failure.

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use quillhouse_commerce::db::UserRepository;
use quillhouse_commerce::models::UserAccount;
use quillhouse_core::{Email, UserRole};

use crate::error::ApiError;
use crate::middleware::RequireAdminApi;
use crate::models::CurrentAdmin;
use crate::state::AppState;

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// Account timestamps, as exposed to the frontend.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUserMetadata {
    pub creation_time: DateTime<Utc>,
    pub last_sign_in_time: Option<DateTime<Utc>>,
}

/// Public view of an account.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub uid: Uuid,
    pub email: Email,
    pub email_verified: bool,
    pub display_name: Option<String>,
    pub phone_number: Option<String>,
    pub disabled: bool,
    pub role: UserRole,
    pub metadata: AuthUserMetadata,
}

impl From<UserAccount> for AuthUser {
    fn from(user: UserAccount) -> Self {
        Self {
            uid: user.uid,
            email: user.email,
            email_verified: user.email_verified,
            display_name: user.display_name,
            phone_number: user.phone,
            disabled: user.disabled,
            role: user.role,
            metadata: AuthUserMetadata {
                creation_time: user.created_at,
                last_sign_in_time: user.last_sign_in_at,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub success: bool,
    pub message: &'static str,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CheckEmailResponse {
    pub success: bool,
    pub exists: bool,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub success: bool,
    pub users: Vec<AuthUser>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: AuthUser,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct UserUpdateResponse {
    pub success: bool,
    pub message: String,
    pub user: AuthUser,
}

fn parse_uid(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim())
        .map_err(|e| ApiError::bad_request("Invalid user id", e.to_string()))
}

/// Refuse operations an admin must not run on their own account.
async fn ensure_not_self(
    users: &UserRepository<'_>,
    admin: &CurrentAdmin,
    uid: Uuid,
    action: &str,
) -> Result<(), ApiError> {
    let own = users
        .get_by_id(admin.id)
        .await
        .map_err(|e| ApiError::from_repository("Failed to look up user", &e))?;

    if own.is_some_and(|own| own.uid == uid) {
        return Err(ApiError::bad_request(
            format!("You cannot {action} your own account"),
            "self-modification",
        ));
    }
    Ok(())
}

/// Liveness check for the user-management API.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        message: "Server is running",
        timestamp: Utc::now(),
    })
}

/// Whether an account exists for an email. Public and rate limited.
#[instrument(skip(state))]
pub async fn check_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<CheckEmailResponse> {
    let parsed = Email::parse(&email)
        .map_err(|e| ApiError::bad_request("Invalid email format", e.to_string()))?;

    let exists = UserRepository::new(state.pool())
        .email_exists(&parsed)
        .await
        .map_err(|e| ApiError::internal("Failed to check email", &e))?;

    Ok(Json(CheckEmailResponse {
        success: true,
        exists,
        email: parsed.into_inner(),
    }))
}

/// Every account, newest first.
#[instrument(skip(state, _admin))]
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdminApi(_admin): RequireAdminApi,
) -> ApiResult<UserListResponse> {
    let users: Vec<AuthUser> = UserRepository::new(state.pool())
        .list_all()
        .await
        .map_err(|e| ApiError::internal("Failed to list users", &e))?
        .into_iter()
        .map(AuthUser::from)
        .collect();

    Ok(Json(UserListResponse {
        success: true,
        count: users.len(),
        users,
    }))
}

/// One account by uid.
#[instrument(skip(state, _admin))]
pub async fn get_user(
    State(state): State<AppState>,
    RequireAdminApi(_admin): RequireAdminApi,
    Path(uid): Path<String>,
) -> ApiResult<UserResponse> {
    let parsed = parse_uid(&uid)?;

    let user = UserRepository::new(state.pool())
        .get_by_uid(parsed)
        .await
        .map_err(|e| ApiError::internal("Failed to get user", &e))?
        .ok_or_else(|| ApiError::user_not_found(&uid))?;

    Ok(Json(UserResponse {
        success: true,
        user: user.into(),
    }))
}

/// Delete an account. Accounts with orders are kept.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdminApi(admin): RequireAdminApi,
    Path(uid): Path<String>,
) -> ApiResult<MessageResponse> {
    let parsed = parse_uid(&uid)?;
    let users = UserRepository::new(state.pool());
    ensure_not_self(&users, &admin, parsed, "delete").await?;

    users
        .delete_by_uid(parsed)
        .await
        .map_err(|e| ApiError::from_repository("Failed to delete user", &e))?;

    tracing::info!(uid = %parsed, "User deleted");

    Ok(Json(MessageResponse {
        success: true,
        message: format!("Successfully deleted user {parsed}"),
    }))
}

async fn set_disabled(
    state: &AppState,
    admin: &CurrentAdmin,
    uid: &str,
    disabled: bool,
) -> ApiResult<UserUpdateResponse> {
    let parsed = parse_uid(uid)?;
    let users = UserRepository::new(state.pool());
    let action = if disabled { "disable" } else { "enable" };

    if disabled {
        ensure_not_self(&users, admin, parsed, action).await?;
    }

    let user = users
        .set_disabled(parsed, disabled)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to {action} user"), &e))?
        .ok_or_else(|| ApiError::user_not_found(uid))?;

    tracing::info!(uid = %parsed, disabled, "User access changed");

    Ok(Json(UserUpdateResponse {
        success: true,
        message: format!("Successfully {action}d user {parsed}"),
        user: user.into(),
    }))
}

/// Block an account from signing in.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn disable_user(
    State(state): State<AppState>,
    RequireAdminApi(admin): RequireAdminApi,
    Path(uid): Path<String>,
) -> ApiResult<UserUpdateResponse> {
    set_disabled(&state, &admin, &uid, true).await
}

/// Allow a disabled account to sign in again.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn enable_user(
    State(state): State<AppState>,
    RequireAdminApi(admin): RequireAdminApi,
    Path(uid): Path<String>,
) -> ApiResult<UserUpdateResponse> {
    set_disabled(&state, &admin, &uid, false).await
}

#[cfg(test)]
mod tests {
    use quillhouse_core::UserId;

    use super::*;

    fn account() -> UserAccount {
        UserAccount {
            id: UserId::new(7),
            uid: Uuid::nil(),
            email: Email::parse("reader@quillhouse.in").unwrap(),
            display_name: Some("Asha".to_string()),
            phone: None,
            role: UserRole::Customer,
            disabled: true,
            email_verified: false,
            last_sign_in_at: None,
            created_at: DateTime::UNIX_EPOCH,
            updated_at: DateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_auth_user_uses_camel_case() {
        let json = serde_json::to_value(AuthUser::from(account())).unwrap();

        assert_eq!(json["email"], "reader@quillhouse.in");
        assert_eq!(json["displayName"], "Asha");
        assert_eq!(json["emailVerified"], false);
        assert_eq!(json["disabled"], true);
        assert_eq!(json["role"], "customer");
        assert!(json["phoneNumber"].is_null());
        assert!(json["metadata"]["lastSignInTime"].is_null());
        assert!(json["metadata"]["creationTime"].is_string());
        assert!(json.get("id").is_none());
    }

    #[test]
    fn test_parse_uid() {
        assert!(parse_uid("00000000-0000-0000-0000-000000000000").is_ok());
        let err = parse_uid("42").unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }
}
