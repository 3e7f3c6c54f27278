//! Shiprocket client against a mock API.

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{bearer_token, body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use quillhouse_commerce::shiprocket::{ShiprocketClient, ShiprocketError};

async fn mount_login(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({
            "email": "api@quillhouse.in",
            "password": "shiprocket-pass"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 42,
            "email": "api@quillhouse.in",
            "token": "sr-token"
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn client(server: &MockServer) -> ShiprocketClient {
    ShiprocketClient::with_base_url(
        server.uri(),
        "api@quillhouse.in",
        SecretString::from("shiprocket-pass"),
    )
    .expect("client")
}

#[tokio::test]
async fn test_token_is_cached_between_calls() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/orders/cancel"))
        .and(bearer_token("sr-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": 200 })))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(&server);
    assert!(!client.has_valid_token().await);

    client.cancel_orders(&[1001]).await.expect("first cancel");
    client.cancel_orders(&[1002]).await.expect("second cancel");

    assert!(client.has_valid_token().await);
}

#[tokio::test]
async fn test_bad_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "Invalid email and password combination",
            "status_code": 400
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .track_awb("AWB1")
        .await
        .expect_err("login fails");

    match err {
        ShiprocketError::AuthenticationFailed(message) => {
            assert_eq!(message, "Invalid email and password combination");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_assign_awb() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/courier/assign/awb"))
        .and(body_json(json!({ "shipment_id": 555 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "awb_assign_status": 1,
            "response": {
                "data": {
                    "awb_code": "1419110022",
                    "courier_name": "Delhivery Surface",
                    "shipment_id": 555
                }
            }
        })))
        .mount(&server)
        .await;

    let awb = client(&server).assign_awb(555).await.expect("awb");
    assert_eq!(awb.awb_code, "1419110022");
    assert_eq!(awb.courier_name, "Delhivery Surface");
}

#[tokio::test]
async fn test_assign_awb_without_courier() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/courier/assign/awb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "awb_assign_status": 0,
            "message": "No courier serviceable for this pincode"
        })))
        .mount(&server)
        .await;

    let err = client(&server).assign_awb(555).await.expect_err("no courier");
    assert!(matches!(err, ShiprocketError::AwbNotAssigned(m) if m.contains("pincode")));
}

#[tokio::test]
async fn test_track_awb() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/courier/track/awb/1419110022"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tracking_data": {
                "track_status": 1,
                "shipment_status": 7,
                "shipment_track": [{ "awb_code": "1419110022", "current_status": "In Transit" }],
                "shipment_track_activities": [
                    {
                        "date": "2026-10-12 14:05:00",
                        "sr-status-label": "IN TRANSIT",
                        "activity": "Bag received at hub",
                        "location": "Bengaluru_Hub"
                    }
                ],
                "track_url": "https://shiprocket.co/tracking/1419110022"
            }
        })))
        .mount(&server)
        .await;

    let tracking = client(&server).track_awb("1419110022").await.expect("tracking");
    assert_eq!(tracking.current_status.as_deref(), Some("In Transit"));
    assert_eq!(tracking.activities.len(), 1);
    assert_eq!(tracking.activities[0].location.as_deref(), Some("Bengaluru_Hub"));
}

#[tokio::test]
async fn test_unauthorized_drops_cached_token() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/orders/cancel"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Token has expired"
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let err = client.cancel_orders(&[1]).await.expect_err("unauthorized");

    assert!(matches!(err, ShiprocketError::Api { status: 401, .. }));
    assert!(!client.has_valid_token().await);
}
