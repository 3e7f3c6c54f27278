//! Coupon management.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use quillhouse_commerce::db::CouponRepository;
use quillhouse_commerce::models::{Coupon, CouponInput};
use quillhouse_core::CouponId;
use quillhouse_core::coupon::normalize_code;

use crate::error::Result;
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

/// Normalize the code and check the rules before they are stored.
fn checked_code(input: &CouponInput) -> Result<String> {
    let code = normalize_code(&input.code)?;
    input.to_rules(code.clone()).check_definition()?;
    Ok(code)
}

/// All coupons, including inactive and affiliate ones.
#[instrument(skip(_admin, state))]
pub async fn index(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<Coupon>>> {
    Ok(Json(CouponRepository::new(state.pool()).list().await?))
}

#[instrument(skip(admin, state, input), fields(admin_id = %admin.id, code = %input.code))]
pub async fn create(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Json(input): Json<CouponInput>,
) -> Result<(StatusCode, Json<Coupon>)> {
    let code = checked_code(&input)?;
    let coupon = CouponRepository::new(state.pool())
        .create(&code, &input)
        .await?;

    tracing::info!(coupon_id = %coupon.id, "Coupon created");
    Ok((StatusCode::CREATED, Json(coupon)))
}

#[instrument(skip(admin, state, input), fields(admin_id = %admin.id))]
pub async fn update(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<CouponId>,
    Json(input): Json<CouponInput>,
) -> Result<Json<Coupon>> {
    let code = checked_code(&input)?;
    let coupon = CouponRepository::new(state.pool())
        .update(id, &code, &input)
        .await?;
    Ok(Json(coupon))
}

#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
pub async fn delete(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<CouponId>,
) -> Result<StatusCode> {
    CouponRepository::new(state.pool()).delete(id).await?;
    tracing::info!(coupon_id = %id, "Coupon deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use quillhouse_core::DiscountKind;
    use quillhouse_core::coupon::CouponError;
    use rust_decimal::Decimal;

    use super::*;
    use crate::error::AppError;

    fn input(code: &str, kind: DiscountKind, value: i64) -> CouponInput {
        CouponInput {
            code: code.to_string(),
            description: String::new(),
            kind,
            value: Decimal::from(value),
            max_discount: None,
            min_order_value: None,
            usage_limit: None,
            per_user_limit: None,
            starts_at: None,
            expires_at: None,
            active: true,
            affiliate_link_id: None,
        }
    }

    #[test]
    fn test_code_is_normalized() {
        let code = checked_code(&input(" diwali25 ", DiscountKind::Percentage, 25)).unwrap();
        assert_eq!(code, "DIWALI25");
    }

    #[test]
    fn test_rules_are_checked() {
        let err = checked_code(&input("TOOMUCH", DiscountKind::Percentage, 120)).unwrap_err();
        assert!(matches!(err, AppError::Coupon(CouponError::InvalidValue(_))));

        let err = checked_code(&input("no spaces", DiscountKind::Fixed, 50)).unwrap_err();
        assert!(matches!(err, AppError::Coupon(CouponError::InvalidCode)));
    }
}
