//! Subscription plans and purchase.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use quillhouse_commerce::db::SubscriptionRepository;
use quillhouse_commerce::models::{Plan, Subscription};
use quillhouse_core::PlanId;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::checkout::PaymentConfirmation;
use crate::services::subscriptions::{self, SubscriptionPayload};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub plan_id: PlanId,
}

/// Plans on sale.
#[instrument(skip(state))]
pub async fn plans(State(state): State<AppState>) -> Result<Json<Vec<Plan>>> {
    Ok(Json(
        SubscriptionRepository::new(state.pool())
            .list_plans(true)
            .await?,
    ))
}

/// The customer's running subscription, or `null`.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn current(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Option<Subscription>>> {
    Ok(Json(
        SubscriptionRepository::new(state.pool())
            .current_for_user(user.id)
            .await?,
    ))
}

/// Start buying a plan.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn start(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<StartRequest>,
) -> Result<Json<SubscriptionPayload>> {
    let payload = subscriptions::start(state.pool(), state.razorpay(), user.id, body.plan_id).await?;
    Ok(Json(payload))
}

/// Confirm the payment and activate the subscription.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn verify(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<PaymentConfirmation>,
) -> Result<Json<Subscription>> {
    let subscription = subscriptions::verify(state.pool(), state.razorpay(), user.id, &body).await?;
    Ok(Json(subscription))
}
