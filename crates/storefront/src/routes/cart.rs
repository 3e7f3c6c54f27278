//! Session cart routes.
//!
//! The cart lives in the session, so guests can fill it before logging in.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use quillhouse_core::cart::Cart;
use quillhouse_core::{BookFormat, BookId, Money};

use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::models::{CurrentUser, session_keys};
use crate::services::Checkout;
use crate::services::checkout::CartView;
use crate::state::AppState;

/// Add-to-cart body.
#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub book_id: BookId,
    pub format: BookFormat,
    pub quantity: Option<u32>,
}

/// Quantity change body. Zero removes the line.
#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub book_id: BookId,
    pub format: BookFormat,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct RemoveRequest {
    pub book_id: BookId,
    pub format: BookFormat,
}

/// Coupon body. An empty or missing code removes the coupon.
#[derive(Debug, Deserialize)]
pub struct CouponRequest {
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CouponPreview {
    pub code: Option<String>,
    pub discount: Money,
    pub cart: CartView,
}

/// Load the cart from the session (empty if none).
pub(crate) async fn load_cart(session: &Session) -> Result<Cart> {
    Ok(session
        .get::<Cart>(session_keys::CART)
        .await?
        .unwrap_or_default())
}

async fn save_cart(session: &Session, cart: &Cart) -> Result<()> {
    session.insert(session_keys::CART, cart).await?;
    Ok(())
}

async fn render(state: &AppState, cart: &Cart, user: Option<&CurrentUser>) -> Result<Json<CartView>> {
    let checkout = Checkout::new(state.pool(), state.razorpay(), &state.config().shipping);
    Ok(Json(checkout.view(cart, user.map(|u| u.id)).await?))
}

/// The priced cart.
#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<CartView>> {
    let cart = load_cart(&session).await?;
    render(&state, &cart, user.as_ref()).await
}

/// Add copies of a book.
#[instrument(skip(state, session, user))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Json(body): Json<AddRequest>,
) -> Result<Json<CartView>> {
    let quantity = body.quantity.unwrap_or(1);
    if quantity == 0 {
        return Err(AppError::BadRequest("Quantity must be at least 1".to_string()));
    }

    let mut cart = load_cart(&session).await?;
    cart.add(body.book_id, body.format, quantity);
    save_cart(&session, &cart).await?;

    render(&state, &cart, user.as_ref()).await
}

/// Change the quantity of a line.
#[instrument(skip(state, session, user))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Json(body): Json<UpdateRequest>,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session).await?;
    if !cart.set_quantity(body.book_id, body.format, body.quantity) {
        return Err(AppError::NotFound("Cart line".to_string()));
    }
    save_cart(&session, &cart).await?;

    render(&state, &cart, user.as_ref()).await
}

/// Remove a line.
#[instrument(skip(state, session, user))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Json(body): Json<RemoveRequest>,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session).await?;
    if !cart.remove(body.book_id, body.format) {
        return Err(AppError::NotFound("Cart line".to_string()));
    }
    save_cart(&session, &cart).await?;

    render(&state, &cart, user.as_ref()).await
}

/// Empty the cart.
#[instrument(skip(state, session))]
pub async fn clear(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session).await?;
    cart.clear();
    save_cart(&session, &cart).await?;

    render(&state, &cart, None).await
}

/// Apply (or remove) a coupon and preview the discount.
///
/// An invalid code is rejected and the cart's current coupon kept.
#[instrument(skip(state, session, user, body))]
pub async fn apply_coupon(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Json(body): Json<CouponRequest>,
) -> Result<Json<CouponPreview>> {
    let mut cart = load_cart(&session).await?;
    let user_id = user.as_ref().map(|u| u.id);
    let checkout = Checkout::new(state.pool(), state.razorpay(), &state.config().shipping);

    let code = body.code.filter(|c| !c.trim().is_empty());
    let Some(code) = code else {
        cart.coupon_code = None;
        save_cart(&session, &cart).await?;
        return Ok(Json(CouponPreview {
            code: None,
            discount: Money::zero(),
            cart: checkout.view(&cart, user_id).await?,
        }));
    };

    let mut bare = cart.clone();
    bare.coupon_code = None;
    let subtotal = checkout.view(&bare, user_id).await?.totals.subtotal;
    let (code, discount) = checkout.coupon_discount(&code, user_id, subtotal).await?;

    cart.coupon_code = Some(code.clone());
    save_cart(&session, &cart).await?;

    Ok(Json(CouponPreview {
        code: Some(code),
        discount,
        cart: checkout.view(&cart, user_id).await?,
    }))
}
