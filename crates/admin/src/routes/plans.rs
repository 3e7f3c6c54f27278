//! Subscription plan management.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use tracing::instrument;

use quillhouse_commerce::db::SubscriptionRepository;
use quillhouse_commerce::models::{Plan, PlanInput};
use quillhouse_core::PlanId;

use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

fn validate(input: &PlanInput) -> Result<()> {
    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest("Plan name is required".to_string()));
    }
    if input.price <= Decimal::ZERO {
        return Err(AppError::BadRequest("Plan price must be positive".to_string()));
    }
    if input.duration_days <= 0 {
        return Err(AppError::BadRequest("Plan duration must be positive".to_string()));
    }
    Ok(())
}

/// All plans, including retired ones.
#[instrument(skip(_admin, state))]
pub async fn index(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<Plan>>> {
    Ok(Json(
        SubscriptionRepository::new(state.pool()).list_plans(false).await?,
    ))
}

#[instrument(skip(admin, state, input), fields(admin_id = %admin.id))]
pub async fn create(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Json(input): Json<PlanInput>,
) -> Result<(StatusCode, Json<Plan>)> {
    validate(&input)?;
    let plan = SubscriptionRepository::new(state.pool())
        .create_plan(&input)
        .await?;
    tracing::info!(plan_id = %plan.id, "Plan created");
    Ok((StatusCode::CREATED, Json(plan)))
}

/// Existing subscriptions keep the dates they were sold with.
#[instrument(skip(admin, state, input), fields(admin_id = %admin.id))]
pub async fn update(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<PlanId>,
    Json(input): Json<PlanInput>,
) -> Result<Json<Plan>> {
    validate(&input)?;
    Ok(Json(
        SubscriptionRepository::new(state.pool())
            .update_plan(id, &input)
            .await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(price: i64, duration_days: i32) -> PlanInput {
        PlanInput {
            name: "Reader Annual".to_string(),
            description: String::new(),
            price: Decimal::from(price),
            duration_days,
            active: true,
        }
    }

    #[test]
    fn test_validate() {
        assert!(validate(&plan(999, 365)).is_ok());
        assert!(validate(&plan(0, 365)).is_err());
        assert!(validate(&plan(999, 0)).is_err());
    }
}
