//! Helpers for end-to-end tests against running Quillhouse servers.
//!
//! # Running Tests
//!
//! ```bash
//! qh-cli migrate && qh-cli seed
//! cargo run -p quillhouse-storefront &
//! cargo run -p quillhouse-admin &
//! QH_TEST_ADMIN_EMAIL=ops@quillhouse.test QH_TEST_ADMIN_PASSWORD=... \
//!     cargo test -p quillhouse-integration-tests -- --ignored
//! ```
//!
//! Tests are `#[ignore]`d so `cargo test` stays hermetic.

use reqwest::Client;
use serde_json::{Value, json};

/// Storefront base URL (`STOREFRONT_BASE_URL`, default `http://localhost:3000`).
#[must_use]
pub fn storefront_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned())
}

/// Admin base URL (`ADMIN_BASE_URL`, default `http://localhost:3001`).
#[must_use]
pub fn admin_url() -> String {
    std::env::var("ADMIN_BASE_URL").unwrap_or_else(|_| "http://localhost:3001".to_owned())
}

/// Client that keeps the session cookie between requests.
///
/// # Panics
///
/// Panics if the HTTP client can't be built.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// A fresh, unique address for registration tests.
#[must_use]
pub fn unique_email() -> String {
    format!("it-{}@quillhouse.test", uuid::Uuid::new_v4().simple())
}

/// Register a customer on the storefront and return the logged-in client.
///
/// # Panics
///
/// Panics if registration fails.
pub async fn registered_customer() -> (Client, String) {
    let client = client();
    let email = unique_email();
    let response = client
        .post(format!("{}/api/auth/register", storefront_url()))
        .json(&json!({
            "email": email,
            "password": "correct horse battery",
            "display_name": "Integration Reader",
        }))
        .send()
        .await
        .expect("register request failed");
    assert_eq!(response.status(), 201, "registration should succeed");
    (client, email)
}

/// Log in to the admin API with `QH_TEST_ADMIN_EMAIL` / `QH_TEST_ADMIN_PASSWORD`.
///
/// # Panics
///
/// Panics if the variables are unset or the login is rejected.
pub async fn admin_client() -> Client {
    let email = std::env::var("QH_TEST_ADMIN_EMAIL").expect("QH_TEST_ADMIN_EMAIL not set");
    let password = std::env::var("QH_TEST_ADMIN_PASSWORD").expect("QH_TEST_ADMIN_PASSWORD not set");

    let client = client();
    let response = client
        .post(format!("{}/api/admin/login", admin_url()))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("admin login request failed");
    assert!(response.status().is_success(), "admin login rejected");
    client
}

/// Parse a JSON response body.
///
/// # Panics
///
/// Panics if the body is not JSON.
pub async fn json_body(response: reqwest::Response) -> Value {
    response.json().await.expect("response body is not JSON")
}
