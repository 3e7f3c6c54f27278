//! E-book subscription purchase.

use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use quillhouse_commerce::db::SubscriptionRepository;
use quillhouse_commerce::models::{Plan, Subscription};
use quillhouse_commerce::razorpay::RazorpayClient;
use quillhouse_core::{PlanId, SubscriptionId, SubscriptionStatus, UserId};

use super::checkout::PaymentConfirmation;
use crate::error::AppError;

/// Client payload for paying a subscription with Razorpay Checkout.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionPayload {
    pub subscription_id: SubscriptionId,
    pub plan: Plan,
    pub gateway_order_id: String,
    /// Amount in paise.
    pub amount: i64,
    pub currency: String,
    pub key_id: String,
}

/// Create a Razorpay order for a plan and a pending subscription.
///
/// # Errors
///
/// Returns `AppError::NotFound` for an unknown or retired plan and
/// `AppError::Payment` if Razorpay refuses the order.
#[instrument(skip(pool, razorpay), fields(user_id = %user_id, plan_id = %plan_id))]
pub async fn start(
    pool: &PgPool,
    razorpay: &RazorpayClient,
    user_id: UserId,
    plan_id: PlanId,
) -> Result<SubscriptionPayload, AppError> {
    let subscriptions = SubscriptionRepository::new(pool);

    let plan = subscriptions
        .get_plan(plan_id)
        .await?
        .filter(|p| p.active)
        .ok_or_else(|| AppError::NotFound(format!("Plan {plan_id}")))?;

    let receipt = format!("sub-{user_id}-{plan_id}");
    let gateway_order = razorpay.create_order(plan.price, &receipt).await?;

    let subscription = subscriptions
        .create_pending(user_id, plan.id, plan.price, &gateway_order.id)
        .await?;

    tracing::info!(
        subscription_id = %subscription.id,
        gateway_order_id = %gateway_order.id,
        "Subscription checkout started"
    );

    Ok(SubscriptionPayload {
        subscription_id: subscription.id,
        plan,
        gateway_order_id: gateway_order.id,
        amount: gateway_order.amount,
        currency: gateway_order.currency,
        key_id: razorpay.key_id().to_owned(),
    })
}

/// Verify the payment and activate the subscription.
///
/// A replayed confirmation for an active subscription returns it unchanged.
///
/// # Errors
///
/// Returns `AppError::NotFound` for an unknown gateway order and
/// `AppError::Payment` for a bad signature.
#[instrument(skip(pool, razorpay, confirmation), fields(user_id = %user_id))]
pub async fn verify(
    pool: &PgPool,
    razorpay: &RazorpayClient,
    user_id: UserId,
    confirmation: &PaymentConfirmation,
) -> Result<Subscription, AppError> {
    let subscriptions = SubscriptionRepository::new(pool);

    let subscription = subscriptions
        .get_by_gateway_order(user_id, &confirmation.razorpay_order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Subscription not found".to_string()))?;

    razorpay.verify_payment_signature(
        &confirmation.razorpay_order_id,
        &confirmation.razorpay_payment_id,
        &confirmation.razorpay_signature,
    )?;

    if subscription.status == SubscriptionStatus::Active {
        return Ok(subscription);
    }

    let active = subscriptions
        .activate(subscription.id, &confirmation.razorpay_payment_id)
        .await?;

    tracing::info!(
        subscription_id = %active.id,
        ends_at = ?active.ends_at,
        "Subscription activated"
    );

    Ok(active)
}
