//! Razorpay client against a mock gateway.

use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{basic_auth, body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use quillhouse_commerce::razorpay::{RazorpayClient, RazorpayError, signature};
use quillhouse_core::Money;

fn client(server: &MockServer) -> RazorpayClient {
    RazorpayClient::with_base_url(
        server.uri(),
        "rzp_test_key",
        SecretString::from("rzp_test_secret"),
    )
    .expect("client")
}

#[tokio::test]
async fn test_create_order_sends_paise() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(basic_auth("rzp_test_key", "rzp_test_secret"))
        .and(body_json(json!({
            "amount": 69_700,
            "currency": "INR",
            "receipt": "QH-100007"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "order_NkX1",
            "entity": "order",
            "amount": 69_700,
            "amount_paid": 0,
            "currency": "INR",
            "receipt": "QH-100007",
            "status": "created"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let order = client(&server)
        .create_order(Money::inr(Decimal::new(697, 0)), "QH-100007")
        .await
        .expect("order created");

    assert_eq!(order.id, "order_NkX1");
    assert_eq!(order.amount, 69_700);
    assert_eq!(order.status, "created");
}

#[tokio::test]
async fn test_api_error_carries_description() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": "BAD_REQUEST_ERROR",
                "description": "Order amount less than minimum amount allowed"
            }
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .create_order(Money::inr(Decimal::new(1, 2)), "QH-1")
        .await
        .expect_err("rejected");

    match err {
        RazorpayError::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Order amount less than minimum amount allowed");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_zero_amount_never_reaches_gateway() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client(&server)
        .create_order(Money::zero(), "QH-1")
        .await
        .expect_err("zero amount");
    assert!(matches!(err, RazorpayError::InvalidAmount(_)));
}

#[tokio::test]
async fn test_refund_partial_amount() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/payments/pay_Q1/refund"))
        .and(body_json(json!({ "amount": 29_900 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "rfnd_A1",
            "entity": "refund",
            "amount": 29_900,
            "currency": "INR",
            "payment_id": "pay_Q1",
            "status": "processed"
        })))
        .mount(&server)
        .await;

    let refund = client(&server)
        .refund("pay_Q1", Money::inr(Decimal::new(299, 0)))
        .await
        .expect("refunded");

    assert_eq!(refund.id, "rfnd_A1");
    assert_eq!(refund.payment_id, "pay_Q1");
    assert_eq!(refund.status, "processed");
}

#[tokio::test]
async fn test_client_verifies_checkout_signature() {
    let server = MockServer::start().await;
    let client = client(&server);

    let good = signature::sign(&SecretString::from("rzp_test_secret"), "order_NkX1", "pay_Q1");
    assert!(client.verify_payment_signature("order_NkX1", "pay_Q1", &good).is_ok());
    assert!(client.verify_payment_signature("order_NkX1", "pay_Q2", &good).is_err());
    assert_eq!(client.key_id(), "rzp_test_key");
}
