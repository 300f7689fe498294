mod common;

use axum::http::StatusCode;
use common::{body_json, session_cookie_value, TestApp};
use serde_json::json;

#[tokio::test]
async fn test_register_creates_identity_and_session() {
    let app = TestApp::spawn().await;

    let response = app
        .request(
            "POST",
            "/auth/register",
            None,
            Some(json!({
                "email": "izzy@example.com",
                "password": "correct-horse",
                "name": "izzy vIckerS",
            })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(session_cookie_value(&response).is_some());

    let body = body_json(response).await;
    assert_eq!(body["email"], "izzy@example.com");
    // Display name is normalized on the way in
    assert_eq!(body["first_name"], "Izzy");
    assert_eq!(body["last_name"], "Vickers");
    // The hash never leaves the service boundary
    assert!(body.get("password_hash").is_none());

    assert_eq!(app.store.identity_count(), 1);
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let app = TestApp::spawn().await;
    app.register("izzy@example.com", "correct-horse", "Izzy").await;

    let response = app
        .request(
            "POST",
            "/auth/register",
            None,
            Some(json!({
                "email": "izzy@example.com",
                "password": "another-password",
                "name": "Someone Else",
            })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(app.store.identity_count(), 1);
}

#[tokio::test]
async fn test_register_duplicate_email_is_case_insensitive() {
    let app = TestApp::spawn().await;
    app.register("izzy@example.com", "correct-horse", "Izzy").await;

    let response = app
        .request(
            "POST",
            "/auth/register",
            None,
            Some(json!({
                "email": "IZZY@EXAMPLE.COM",
                "password": "another-password",
                "name": "Someone Else",
            })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(app.store.identity_count(), 1);
}

#[tokio::test]
async fn test_register_missing_fields_rejected() {
    let app = TestApp::spawn().await;

    // Field absent entirely
    let response = app
        .request(
            "POST",
            "/auth/register",
            None,
            Some(json!({ "email": "izzy@example.com", "password": "correct-horse" })),
        )
        .await;
    assert!(response.status().is_client_error());

    // Fields present but invalid
    for body in [
        json!({ "email": "not-an-email", "password": "correct-horse", "name": "Izzy" }),
        json!({ "email": "izzy@example.com", "password": "short", "name": "Izzy" }),
        json!({ "email": "izzy@example.com", "password": "correct-horse", "name": "" }),
    ] {
        let response = app.request("POST", "/auth/register", None, Some(body)).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    assert_eq!(app.store.identity_count(), 0);
}

#[tokio::test]
async fn test_single_token_name_has_empty_last_name() {
    let app = TestApp::spawn().await;

    let response = app
        .request(
            "POST",
            "/auth/register",
            None,
            Some(json!({
                "email": "izzy@example.com",
                "password": "correct-horse",
                "name": "Izzy",
            })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["first_name"], "Izzy");
    assert_eq!(body["last_name"], "");
}
