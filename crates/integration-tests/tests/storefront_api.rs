//! Storefront API against a running server with seeded data.

use quillhouse_integration_tests::{client, json_body, registered_customer, storefront_url};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
#[ignore = "Requires a running storefront"]
async fn test_health() {
    let response = client()
        .get(format!("{}/health/ready", storefront_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires a running storefront with seeded books"]
async fn test_catalog_lists_published_books() {
    let response = client()
        .get(format!("{}/api/books", storefront_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let list = json_body(response).await;
    let books = list["books"].as_array().expect("book list");
    assert!(!books.is_empty(), "run `qh-cli seed` first");
    assert!(books.iter().all(|b| b["status"] == "published"));
}

#[tokio::test]
#[ignore = "Requires a running storefront"]
async fn test_register_then_me() {
    let (client, email) = registered_customer().await;

    let response = client
        .get(format!("{}/api/auth/me", storefront_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["user"]["email"], email.as_str());
}

#[tokio::test]
#[ignore = "Requires a running storefront"]
async fn test_duplicate_registration_conflicts() {
    let (_, email) = registered_customer().await;

    let response = client()
        .post(format!("{}/api/auth/register", storefront_url()))
        .json(&json!({ "email": email, "password": "another long password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires a running storefront with seeded books"]
async fn test_cart_add_and_unknown_coupon() {
    let client = client();
    let base = storefront_url();

    let list = json_body(client.get(format!("{base}/api/books")).send().await.unwrap()).await;
    let book_id = list["books"][0]["id"].clone();

    let response = client
        .post(format!("{base}/api/cart/add"))
        .json(&json!({ "book_id": book_id, "format": "print", "quantity": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cart = json_body(client.get(format!("{base}/api/cart")).send().await.unwrap()).await;
    assert_eq!(cart["item_count"], 2);

    let response = client
        .post(format!("{base}/api/cart/coupon"))
        .json(&json!({ "code": "NO-SUCH-COUPON" }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
#[ignore = "Requires a running storefront"]
async fn test_checkout_rejects_empty_cart() {
    let (client, _) = registered_customer().await;

    let response = client
        .post(format!("{}/api/checkout", storefront_url()))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
