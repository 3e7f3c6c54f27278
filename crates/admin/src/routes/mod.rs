//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health, /health/ready
//!
//! # Admin session
//! POST /api/admin/login | /api/admin/logout
//! GET  /api/admin/session
//!
//! # User management (JSON `{success, ...}` bodies)
//! GET    /api/health
//! GET    /api/check-email/{email}         - public, rate limited
//! GET    /api/list-users
//! GET    /api/auth-user/{uid}
//! DELETE /api/delete-auth-user/{uid}
//! POST   /api/disable-auth-user/{uid} | /api/enable-auth-user/{uid}
//!
//! # Back-office (admin role)
//! GET  /api/orders?status=&page= | GET /api/orders/{id}
//! POST /api/orders/{id}/status | /cancel | /refund | /shipment
//! GET  /api/orders/{id}/tracking
//! GET  /api/transactions?kind=
//! GET/POST /api/coupons | PUT/DELETE /api/coupons/{id}
//! GET/POST /api/banners | PUT/DELETE /api/banners/{id}
//! GET  /api/books?status= | POST /api/books/{id}/approve | /reject | /archive
//! PUT  /api/books/{id}/inventory | PUT /api/authors/{id}/royalty
//! GET/POST /api/plans | PUT /api/plans/{id}
//! GET/POST /api/jobs | PUT/DELETE /api/jobs/{id} | GET /api/jobs/{id}/applications
//! POST /api/applications/{id}/status
//! GET/POST /api/updates | PUT/DELETE /api/updates/{id}
//! DELETE /api/reviews/{id}
//! GET  /api/reports/sales?year= | /api/reports/dashboard
//! ```

pub mod auth;
pub mod banners;
pub mod books;
pub mod coupons;
pub mod jobs;
pub mod orders;
pub mod plans;
pub mod reports;
pub mod reviews;
pub mod transactions;
pub mod updates;
pub mod users;

use axum::{
    Router,
    extract::{MatchedPath, Request, State},
    http::StatusCode,
    middleware::from_fn,
    routing::{delete, get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::middleware::{
    create_session_layer, login_rate_limiter, lookup_rate_limiter, request_id_middleware,
    security_headers_middleware,
};
use crate::state::AppState;

fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .layer(login_rate_limiter())
        .route("/logout", post(auth::logout))
        .route("/session", get(auth::current))
}

/// The user-management API.
fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/check-email/{email}", get(users::check_email))
        .layer(lookup_rate_limiter())
        .route("/health", get(users::health))
        .route("/list-users", get(users::list_users))
        .route("/auth-user/{uid}", get(users::get_user))
        .route("/delete-auth-user/{uid}", delete(users::delete_user))
        .route("/disable-auth-user/{uid}", post(users::disable_user))
        .route("/enable-auth-user/{uid}", post(users::enable_user))
}

fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
        .route("/{id}/status", post(orders::update_status))
        .route("/{id}/cancel", post(orders::cancel))
        .route("/{id}/refund", post(orders::refund))
        .route("/{id}/shipment", post(orders::create_shipment))
        .route("/{id}/tracking", get(orders::tracking))
}

fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/books", get(books::index))
        .route("/books/{id}/approve", post(books::approve))
        .route("/books/{id}/reject", post(books::reject))
        .route("/books/{id}/archive", post(books::archive))
        .route("/books/{id}/inventory", put(books::update_inventory))
        .route("/authors/{id}/royalty", put(books::set_royalty))
        .route("/reviews/{id}", delete(reviews::delete))
}

fn marketing_routes() -> Router<AppState> {
    Router::new()
        .route("/coupons", get(coupons::index).post(coupons::create))
        .route(
            "/coupons/{id}",
            put(coupons::update).delete(coupons::delete),
        )
        .route("/banners", get(banners::index).post(banners::create))
        .route(
            "/banners/{id}",
            put(banners::update).delete(banners::delete),
        )
        .route("/plans", get(plans::index).post(plans::create))
        .route("/plans/{id}", put(plans::update))
}

fn content_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", get(jobs::index).post(jobs::create))
        .route("/jobs/{id}", put(jobs::update).delete(jobs::delete))
        .route("/jobs/{id}/applications", get(jobs::applications))
        .route(
            "/applications/{id}/status",
            post(jobs::set_application_status),
        )
        .route("/updates", get(updates::index).post(updates::create))
        .route(
            "/updates/{id}",
            put(updates::update).delete(updates::delete),
        )
}

/// All `/api` routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/admin", session_routes())
        .merge(user_routes())
        .nest("/orders", order_routes())
        .route("/transactions", get(transactions::index))
        .merge(catalog_routes())
        .merge(marketing_routes())
        .merge(content_routes())
        .route("/reports/sales", get(reports::sales))
        .route("/reports/dashboard", get(reports::dashboard))
}

/// The complete admin application, without the Sentry layers.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.pool(), state.config());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
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
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::{AdminConfig, RazorpayConfig};

    fn test_state() -> AppState {
        let config = AdminConfig {
            database_url: SecretString::from("postgres://localhost/quillhouse_test"),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3001,
            base_url: "http://localhost:3001".to_owned(),
            storefront_url: "http://localhost:3000".to_owned(),
            session_secret: SecretString::from("Zp4Lw9qTn2Vx7Kc3Hb8Rm5Jd1Gs6Fy0A"),
            razorpay: RazorpayConfig {
                key_id: "rzp_test_key".to_owned(),
                key_secret: SecretString::from("rzp_test_secret"),
            },
            shiprocket: None,
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

        AppState::from_parts(config, pool, razorpay, None, Mailer::disabled())
    }

    fn request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("fly-client-ip", "203.0.113.20")
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(test_state())
            .oneshot(request("GET", "/health"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(response.headers().get("cache-control").unwrap(), "no-store");
    }

    #[tokio::test]
    async fn test_api_health_body() {
        let response = app(test_state())
            .oneshot(request("GET", "/api/health"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Server is running");
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_back_office_requires_login() {
        let routes = [
            ("GET", "/api/orders"),
            ("GET", "/api/orders/1"),
            ("POST", "/api/orders/1/shipment"),
            ("GET", "/api/transactions"),
            ("GET", "/api/coupons"),
            ("DELETE", "/api/banners/1"),
            ("GET", "/api/books?status=pending_review"),
            ("POST", "/api/books/1/approve"),
            ("GET", "/api/plans"),
            ("GET", "/api/jobs/1/applications"),
            ("DELETE", "/api/reviews/1"),
            ("GET", "/api/reports/dashboard"),
        ];
        for (method, uri) in routes {
            let response = app(test_state())
                .oneshot(request(method, uri))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn test_user_management_requires_login() {
        let response = app(test_state())
            .oneshot(request("GET", "/api/list-users"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let json = json_body(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Admin login required");
    }

    #[tokio::test]
    async fn test_check_email_rejects_invalid_address() {
        let response = app(test_state())
            .oneshot(request("GET", "/api/check-email/not-an-email"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = json_body(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Invalid email format");
    }

    #[tokio::test]
    async fn test_anonymous_session() {
        let response = app(test_state())
            .oneshot(request("GET", "/api/admin/session"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert!(json["admin"].is_null());
    }
}
