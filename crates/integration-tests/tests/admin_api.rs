//! Admin back-office and user-management API against a running server.

use quillhouse_integration_tests::{
    admin_client, admin_url, client, json_body, registered_customer, storefront_url,
};
use reqwest::StatusCode;

#[tokio::test]
#[ignore = "Requires a running admin server"]
async fn test_api_health() {
    let response = client()
        .get(format!("{}/api/health", admin_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Server is running");
}

#[tokio::test]
#[ignore = "Requires running storefront and admin servers"]
async fn test_check_email_finds_registered_account() {
    let (_, email) = registered_customer().await;

    let response = client()
        .get(format!("{}/api/check-email/{email}", admin_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["exists"], true);
}

#[tokio::test]
#[ignore = "Requires a running admin server"]
async fn test_customer_session_is_not_admin() {
    let response = client()
        .get(format!("{}/api/list-users", admin_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["success"], false);
}

#[tokio::test]
#[ignore = "Requires running servers and admin credentials"]
async fn test_disable_and_enable_user() {
    let (_, email) = registered_customer().await;
    let admin = admin_client().await;
    let base = admin_url();

    let users = json_body(admin.get(format!("{base}/api/list-users")).send().await.unwrap()).await;
    let uid = users["users"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["email"] == email.as_str())
        .map(|u| u["uid"].as_str().unwrap().to_owned())
        .expect("registered user is listed");

    let response = admin
        .post(format!("{base}/api/disable-auth-user/{uid}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["user"]["disabled"], true);

    let response = admin
        .post(format!("{base}/api/enable-auth-user/{uid}"))
        .send()
        .await
        .unwrap();
    assert_eq!(json_body(response).await["user"]["disabled"], false);

    let response = admin
        .delete(format!("{base}/api/delete-auth-user/{uid}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = admin
        .get(format!("{base}/api/auth-user/{uid}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running servers and admin credentials"]
async fn test_disabling_user_ends_their_session() {
    let (customer, email) = registered_customer().await;
    let admin = admin_client().await;
    let base = admin_url();
    let orders = format!("{}/api/account/orders", storefront_url());

    let response = customer.get(&orders).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = admin
        .get(format!("{base}/api/check-email/{email}"))
        .send()
        .await
        .unwrap();
    assert_eq!(json_body(response).await["exists"], true);

    let users = json_body(admin.get(format!("{base}/api/list-users")).send().await.unwrap()).await;
    let uid = users["users"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["email"] == email.as_str())
        .map(|u| u["uid"].as_str().unwrap().to_owned())
        .expect("registered user is listed");

    let response = admin
        .post(format!("{base}/api/disable-auth-user/{uid}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = customer.get(&orders).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Re-enabling does not revive the ended session.
    admin
        .post(format!("{base}/api/enable-auth-user/{uid}"))
        .send()
        .await
        .unwrap();
    let response = customer.get(&orders).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running servers and admin credentials"]
async fn test_unknown_uid_and_bad_uid() {
    let admin = admin_client().await;
    let base = admin_url();

    let response = admin
        .get(format!("{base}/api/auth-user/{}", uuid::Uuid::new_v4()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = admin
        .get(format!("{base}/api/auth-user/not-a-uid"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running servers and admin credentials"]
async fn test_reports() {
    let admin = admin_client().await;
    let base = admin_url();

    let response = admin
        .get(format!("{base}/api/reports/dashboard"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = admin
        .get(format!("{base}/api/reports/sales?year=2025"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["year"], 2025);
}
