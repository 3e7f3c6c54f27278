//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health, /health/ready
//! GET  /r/{code}                          - Affiliate redirect
//!
//! # Auth
//! POST /api/auth/register | /login | /logout
//! GET  /api/auth/me | PUT /api/auth/me
//!
//! # Catalog and content
//! GET  /api/books                         - ?q=&category=&author=&page=
//! GET  /api/books/{slug}
//! GET  /api/books/{id}/reviews | POST (auth)
//! GET  /api/banners | /api/updates | /api/jobs
//! POST /api/jobs/{id}/apply
//!
//! # Cart and checkout
//! GET  /api/cart | DELETE /api/cart
//! POST /api/cart/add | /update | /remove | /coupon
//! POST /api/checkout | /api/checkout/verify          (auth)
//!
//! # Account (auth)
//! GET  /api/account/orders | /api/account/orders/{id}
//! POST /api/account/orders/{id}/cancel
//! GET  /api/subscriptions/plans | /api/subscriptions/current
//! POST /api/subscriptions | /api/subscriptions/verify
//! GET  /api/library | /api/library/{book_id}
//!
//! # Author portal (author role)
//! GET/PUT /api/author/profile
//! GET/POST /api/author/books | PUT /api/author/books/{id}
//! POST /api/author/books/{id}/submit
//! GET  /api/author/sales?year=
//! GET/POST /api/author/affiliate-links
//! ```

pub mod account;
pub mod affiliate;
pub mod auth;
pub mod author;
pub mod books;
pub mod cart;
pub mod checkout;
pub mod content;
pub mod library;
pub mod subscriptions;

use axum::{
    Router,
    extract::{MatchedPath, Request, State},
    http::StatusCode,
    middleware::from_fn,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::middleware::{
    api_rate_limiter, auth_rate_limiter, create_session_layer, request_id_middleware,
    security_headers_middleware,
};
use crate::state::AppState;

/// Login and registration, behind the strict rate limiter.
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(auth_rate_limiter())
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me).put(auth::update_me))
}

fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/books", get(books::index))
        .route("/books/{slug}", get(books::show))
        .route(
            "/books/{id}/reviews",
            get(books::reviews).post(books::create_review),
        )
        .route("/banners", get(content::banners))
        .route("/updates", get(content::updates))
        .route("/jobs", get(content::jobs))
        .route("/jobs/{id}/apply", post(content::apply))
}

fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/coupon", post(cart::apply_coupon))
}

fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(account::orders))
        .route("/orders/{id}", get(account::order))
        .route("/orders/{id}/cancel", post(account::cancel))
}

fn subscription_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(subscriptions::start))
        .route("/plans", get(subscriptions::plans))
        .route("/current", get(subscriptions::current))
        .route("/verify", post(subscriptions::verify))
}

fn author_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(author::profile).put(author::update_profile))
        .route("/books", get(author::books).post(author::create_book))
        .route("/books/{id}", put(author::update_book))
        .route("/books/{id}/submit", post(author::submit_book))
        .route("/sales", get(author::sales))
        .route(
            "/affiliate-links",
            get(author::links).post(author::create_link),
        )
}

/// All `/api` routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .merge(catalog_routes())
        .nest("/cart", cart_routes())
        .route("/checkout", post(checkout::start))
        .route("/checkout/verify", post(checkout::verify))
        .nest("/account", account_routes())
        .nest("/subscriptions", subscription_routes())
        .route("/library", get(library::index))
        .route("/library/{book_id}", get(library::read))
        .nest("/author", author_routes())
        .layer(api_rate_limiter())
}

/// The complete storefront application, without the Sentry layers.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.pool(), state.config());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/r/{code}", get(affiliate::redirect))
        .nest("/api", api_routes())
        .layer(from_fn(security_headers_middleware))
        .layer(session_layer)
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request| {
                    let matched = request
                        .extensions()
                        .get::<MatchedPath>()
                        .map_or(request.uri().path(), MatchedPath::as_str);
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        route = matched,
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::response::Response,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        tracing::debug!("response");
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use quillhouse_commerce::email::Mailer;
    use quillhouse_commerce::razorpay::RazorpayClient;
    use quillhouse_core::cart::ShippingPolicy;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::{RazorpayConfig, StorefrontConfig};

    fn test_state() -> AppState {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/quillhouse_test"),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            base_url: "http://localhost:3000".to_owned(),
            session_secret: SecretString::from("k7Hq2mXv9pLr4tNw8yBz3cFd6gJs1aEu"),
            razorpay: RazorpayConfig {
                key_id: "rzp_test_key".to_owned(),
                key_secret: SecretString::from("rzp_test_secret"),
            },
            shipping: ShippingPolicy::default(),
            email: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };

        // Never connects unless a handler touches the database.
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/quillhouse_test")
            .unwrap();
        let razorpay =
            RazorpayClient::new("rzp_test_key", SecretString::from("rzp_test_secret")).unwrap();

        AppState::from_parts(config, pool, razorpay, Mailer::disabled())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("x-forwarded-for", "203.0.113.10")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(test_state()).oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(
            response.headers().get("x-frame-options").unwrap(),
            "DENY"
        );
    }

    #[tokio::test]
    async fn test_account_requires_login() {
        for uri in ["/api/account/orders", "/api/library", "/api/auth/me"] {
            let response = app(test_state()).oneshot(get(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_author_portal_requires_login() {
        let response = app(test_state())
            .oneshot(get("/api/author/books"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_empty_cart_for_guest() {
        let response = app(test_state()).oneshot(get("/api/cart")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let cart: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(cart["item_count"], 0);
        assert_eq!(cart["checkout_ready"], false);
        assert_eq!(cart["lines"].as_array().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn test_checkout_requires_login() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/checkout")
            .header("x-forwarded-for", "203.0.113.10")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let response = app(test_state()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
