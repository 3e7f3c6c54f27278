//! Registration, login and session routes.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use quillhouse_commerce::db::UserRepository;
use quillhouse_commerce::models::UserAccount;

use crate::error::{AppError, Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::services::AuthService;
use crate::state::AppState;

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub password_confirm: Option<String>,
    pub display_name: Option<String>,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Profile update body.
#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub display_name: Option<String>,
    pub phone: Option<String>,
}

/// The logged-in account.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserAccount,
}

async fn start_session(session: &Session, user: &UserAccount) -> Result<()> {
    let current = CurrentUser::from(user);
    set_current_user(session, &current).await?;
    set_sentry_user(&current.id, Some(current.email.as_str()));
    Ok(())
}

/// Create an account and log it in.
#[instrument(skip(state, session, body), fields(email = %body.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<MeResponse>)> {
    if body
        .password_confirm
        .as_deref()
        .is_some_and(|confirm| confirm != body.password)
    {
        return Err(AppError::BadRequest("Passwords do not match".to_string()));
    }

    let user = AuthService::new(state.pool())
        .register_with_password(&body.email, &body.password, body.display_name.as_deref())
        .await?;

    start_session(&session, &user).await?;
    add_breadcrumb("auth", "registered", None);
    tracing::info!(user_id = %user.id, "Account registered");

    Ok((StatusCode::CREATED, Json(MeResponse { user })))
}

/// Log in with email and password.
#[instrument(skip(state, session, body), fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<MeResponse>> {
    let user = AuthService::new(state.pool())
        .login_with_password(&body.email, &body.password)
        .await?;

    start_session(&session, &user).await?;
    add_breadcrumb("auth", "logged in", None);

    Ok(Json(MeResponse { user }))
}

/// Log out, keeping the cart.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// The current account, fresh from the database.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn me(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Json<MeResponse>> {
    let Some(account) = UserRepository::new(state.pool()).get_by_id(user.id).await? else {
        clear_current_user(&session).await?;
        return Err(AppError::Unauthorized("Account no longer exists".to_string()));
    };

    Ok(Json(MeResponse { user: account }))
}

/// Update display name and phone.
#[instrument(skip(state, session, user, body), fields(user_id = %user.id))]
pub async fn update_me(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Json(body): Json<ProfileRequest>,
) -> Result<Json<MeResponse>> {
    let display_name = body.display_name.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let phone = body.phone.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let account = UserRepository::new(state.pool())
        .update_profile(user.id, display_name, phone)
        .await?;

    session
        .insert(
            crate::models::session_keys::CURRENT_USER,
            CurrentUser::from(&account),
        )
        .await?;

    Ok(Json(MeResponse { user: account }))
}
