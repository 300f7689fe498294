mod common;

use axum::http::StatusCode;
use chrono::Utc;
use common::{TestApp, WEBHOOK_SECRET};
use identity_service::services::webhook::sign_payload;

fn signed(body: &str) -> String {
    sign_payload(WEBHOOK_SECRET, Utc::now().timestamp(), body)
}

#[tokio::test]
async fn test_checkout_event_links_billing_account() {
    let app = TestApp::spawn().await;
    let session = app.register("izzy@example.com", "correct-horse", "Izzy").await;

    let body = r#"{"id":"evt_1","type":"checkout.completed","data":{"customer":"cus_9","email":"izzy@example.com","plan":"pro"}}"#;
    let response = app.send_webhook(body, Some(&signed(body))).await;
    assert_eq!(response.status(), StatusCode::OK);

    // The plan change is visible on the very next request
    let me = app.request("GET", "/users/me", Some(&session), None).await;
    let profile = common::body_json(me).await;
    assert_eq!(profile["plan"], "pro");
}

#[tokio::test]
async fn test_subscription_lifecycle_events() {
    let app = TestApp::spawn().await;
    let session = app.register("izzy@example.com", "correct-horse", "Izzy").await;

    let checkout = r#"{"id":"evt_1","type":"checkout.completed","data":{"customer":"cus_9","email":"izzy@example.com","plan":"pro"}}"#;
    app.send_webhook(checkout, Some(&signed(checkout))).await;

    let canceled = r#"{"id":"evt_2","type":"subscription.canceled","data":{"customer":"cus_9"}}"#;
    let response = app.send_webhook(canceled, Some(&signed(canceled))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let me = app.request("GET", "/users/me", Some(&session), None).await;
    let profile = common::body_json(me).await;
    assert_eq!(profile["plan"], "free");
}

#[tokio::test]
async fn test_tampered_body_rejected_without_side_effects() {
    let app = TestApp::spawn().await;
    let session = app.register("izzy@example.com", "correct-horse", "Izzy").await;

    let body = r#"{"id":"evt_1","type":"checkout.completed","data":{"customer":"cus_9","email":"izzy@example.com","plan":"pro"}}"#;
    let signature = signed(body);

    let tampered = body.replace("pro", "enterprise");
    let response = app.send_webhook(&tampered, Some(&signature)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing was dispatched
    let me = app.request("GET", "/users/me", Some(&session), None).await;
    let profile = common::body_json(me).await;
    assert_eq!(profile["plan"], "free");
}

#[tokio::test]
async fn test_missing_signature_header_rejected() {
    let app = TestApp::spawn().await;

    let body = r#"{"id":"evt_1","type":"checkout.completed","data":{}}"#;
    let response = app.send_webhook(body, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unrecognized_signed_event_is_acknowledged() {
    let app = TestApp::spawn().await;

    let body = r#"{"id":"evt_1","type":"payout.created","data":{}}"#;
    let response = app.send_webhook(body, Some(&signed(body))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_wrong_secret_rejected() {
    let app = TestApp::spawn().await;

    let body = r#"{"id":"evt_1","type":"checkout.completed","data":{}}"#;
    let header = sign_payload("whsec_other", Utc::now().timestamp(), body);
    let response = app.send_webhook(body, Some(&header)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
