//! Admin login and logout.
//!
//! Admins are regular accounts with the `admin` role; there is no separate
//! admin user table. Every failure mode answers with the same 401 so the
//! endpoint can't be used to probe which emails are admins.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use quillhouse_commerce::db::UserRepository;
use quillhouse_commerce::password::verify_password;
use quillhouse_core::{Email, UserRole};

use crate::error::{AppError, Result};
use crate::middleware::{OptionalAdminAuth, clear_current_admin, set_current_admin};
use crate::models::CurrentAdmin;
use crate::state::AppState;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// The admin bound to the session, if any.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub admin: Option<CurrentAdmin>,
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid credentials".to_string())
}

/// Log in with email and password. Only enabled `admin` accounts may.
#[instrument(skip(state, session, body), fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<SessionResponse>> {
    let email = Email::parse(&body.email).map_err(|_| invalid_credentials())?;
    let users = UserRepository::new(state.pool());

    let (user, password_hash) = users
        .get_password_hash(&email)
        .await?
        .ok_or_else(invalid_credentials)?;

    verify_password(&body.password, &password_hash).map_err(|_| invalid_credentials())?;

    if user.role != UserRole::Admin || user.disabled {
        tracing::warn!(user_id = %user.id, role = %user.role, "Rejected admin login");
        return Err(invalid_credentials());
    }

    users.record_sign_in(user.id).await?;

    let admin = CurrentAdmin::from(&user);
    set_current_admin(&session, &admin).await?;
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(admin.id.to_string()),
            email: Some(admin.email.to_string()),
            ..Default::default()
        }));
    });
    tracing::info!(admin_id = %admin.id, "Admin logged in");

    Ok(Json(SessionResponse { admin: Some(admin) }))
}

/// End the admin session.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_admin(&session).await?;
    sentry::configure_scope(|scope| scope.set_user(None));
    Ok(StatusCode::NO_CONTENT)
}

/// Who is logged in.
pub async fn current(OptionalAdminAuth(admin): OptionalAdminAuth) -> Json<SessionResponse> {
    Json(SessionResponse { admin })
}
