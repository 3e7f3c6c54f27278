//! Checkout routes.

use axum::{Json, extract::State};
use tower_sessions::Session;
use tracing::instrument;

use quillhouse_commerce::db::OrderRepository;
use quillhouse_commerce::models::Order;

use super::cart::load_cart;
use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::session_keys;
use crate::services::Checkout;
use crate::services::checkout::{CheckoutPayload, CheckoutRequest, PaymentConfirmation};
use crate::state::AppState;

/// Start checkout for the session cart.
///
/// The cart is kept until payment is confirmed. Orders placed without
/// payment clear it immediately.
#[instrument(skip(state, session, user, body), fields(user_id = %user.id))]
pub async fn start(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Json(body): Json<CheckoutRequest>,
) -> Result<Json<CheckoutPayload>> {
    let mut cart = load_cart(&session).await?;
    let affiliate = session
        .get::<String>(session_keys::AFFILIATE_CODE)
        .await?;

    let checkout = Checkout::new(state.pool(), state.razorpay(), &state.config().shipping);
    let payload = checkout.start(user.id, &cart, body, affiliate).await?;
    add_breadcrumb("checkout", "started", Some(&[("order", payload.order_number.as_str())]));

    if payload.paid {
        cart.clear();
        session.insert(session_keys::CART, &cart).await?;

        if let Some(order) = OrderRepository::new(state.pool())
            .get(payload.order_id)
            .await?
        {
            state
                .mailer()
                .order_confirmation(user.email.as_str(), user.greeting_name(), &order)
                .await;
        }
    }

    Ok(Json(payload))
}

/// Confirm a Razorpay payment, place the order and empty the cart.
#[instrument(skip(state, session, user, body), fields(user_id = %user.id))]
pub async fn verify(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Json(body): Json<PaymentConfirmation>,
) -> Result<Json<Order>> {
    let checkout = Checkout::new(state.pool(), state.razorpay(), &state.config().shipping);
    let (order, newly_placed) = checkout.verify(user.id, &body).await?;

    let mut cart = load_cart(&session).await?;
    if !cart.is_empty() {
        cart.clear();
        session.insert(session_keys::CART, &cart).await?;
    }
    session
        .remove::<String>(session_keys::AFFILIATE_CODE)
        .await?;

    if newly_placed {
        add_breadcrumb("checkout", "paid", Some(&[("order", order.order_number.as_str())]));
        state
            .mailer()
            .order_confirmation(user.email.as_str(), user.greeting_name(), &order)
            .await;
    }

    Ok(Json(order))
}
