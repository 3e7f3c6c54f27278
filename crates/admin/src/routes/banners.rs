//! Hero banner management.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use quillhouse_commerce::db::BannerRepository;
use quillhouse_commerce::models::{Banner, BannerInput};
use quillhouse_core::BannerId;

use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

fn is_http_url(raw: &str) -> bool {
    url::Url::parse(raw).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

fn validate(input: &BannerInput) -> Result<()> {
    if input.title.trim().is_empty() {
        return Err(AppError::BadRequest("Banner title is required".to_string()));
    }
    if !is_http_url(&input.image_url) {
        return Err(AppError::BadRequest("Image URL must be http(s)".to_string()));
    }
    // Relative links stay on the storefront.
    if let Some(link) = input.link_url.as_deref()
        && !link.starts_with('/')
        && !is_http_url(link)
    {
        return Err(AppError::BadRequest(
            "Link must be a path or an http(s) URL".to_string(),
        ));
    }
    if let (Some(start), Some(end)) = (input.starts_at, input.ends_at)
        && end <= start
    {
        return Err(AppError::BadRequest("Banner must end after it starts".to_string()));
    }
    Ok(())
}

/// All banners, in display order.
#[instrument(skip(_admin, state))]
pub async fn index(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<Banner>>> {
    Ok(Json(BannerRepository::new(state.pool()).list().await?))
}

#[instrument(skip(admin, state, input), fields(admin_id = %admin.id))]
pub async fn create(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Json(input): Json<BannerInput>,
) -> Result<(StatusCode, Json<Banner>)> {
    validate(&input)?;
    let banner = BannerRepository::new(state.pool()).create(&input).await?;
    Ok((StatusCode::CREATED, Json(banner)))
}

#[instrument(skip(admin, state, input), fields(admin_id = %admin.id))]
pub async fn update(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<BannerId>,
    Json(input): Json<BannerInput>,
) -> Result<Json<Banner>> {
    validate(&input)?;
    Ok(Json(
        BannerRepository::new(state.pool()).update(id, &input).await?,
    ))
}

#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
pub async fn delete(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<BannerId>,
) -> Result<StatusCode> {
    BannerRepository::new(state.pool()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn banner(image_url: &str, link_url: Option<&str>) -> BannerInput {
        BannerInput {
            title: "Monsoon reads".to_string(),
            subtitle: None,
            image_url: image_url.to_string(),
            link_url: link_url.map(String::from),
            position: 0,
            active: true,
            starts_at: None,
            ends_at: None,
        }
    }

    #[test]
    fn test_validate_links() {
        assert!(validate(&banner("https://cdn.quillhouse.in/b.jpg", Some("/books/kaveri"))).is_ok());
        assert!(validate(&banner("https://cdn.quillhouse.in/b.jpg", None)).is_ok());
        assert!(validate(&banner("ftp://cdn/b.jpg", None)).is_err());
        assert!(validate(&banner("https://cdn.quillhouse.in/b.jpg", Some("javascript:alert(1)"))).is_err());
    }
}
