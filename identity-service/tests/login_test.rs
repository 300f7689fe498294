mod common;

use axum::http::StatusCode;
use common::{body_json, session_cookie_value, TestApp};
use serde_json::json;

#[tokio::test]
async fn test_login_success_starts_session() {
    let app = TestApp::spawn().await;
    app.register("izzy@example.com", "correct-horse", "Izzy").await;

    let response = app
        .request(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "izzy@example.com", "password": "correct-horse" })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let session_id = session_cookie_value(&response).expect("session cookie");

    let me = app.request("GET", "/users/me", Some(&session_id), None).await;
    assert_eq!(me.status(), StatusCode::OK);
    let body = body_json(me).await;
    assert_eq!(body["email"], "izzy@example.com");
}

#[tokio::test]
async fn test_login_email_is_case_insensitive() {
    let app = TestApp::spawn().await;
    app.register("izzy@example.com", "correct-horse", "Izzy").await;

    let response = app
        .request(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "Izzy@Example.com", "password": "correct-horse" })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_failed_login_legs_are_indistinguishable() {
    let app = TestApp::spawn().await;
    app.register("izzy@example.com", "correct-horse", "Izzy").await;

    // Wrong password for a real account
    let wrong_password = app
        .request(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "izzy@example.com", "password": "wrong-password" })),
        )
        .await;

    // Unknown email entirely
    let unknown_email = app
        .request(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": "wrong-password" })),
        )
        .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);

    // Same response body regardless of which leg failed
    let body_a = body_json(wrong_password).await;
    let body_b = body_json(unknown_email).await;
    assert_eq!(body_a, body_b);
    assert_eq!(body_a["error"], "incorrect email or password");
}

#[tokio::test]
async fn test_logout_destroys_session() {
    let app = TestApp::spawn().await;
    let session_id = app.register("izzy@example.com", "correct-horse", "Izzy").await;

    let response = app
        .request("POST", "/auth/logout", Some(&session_id), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let me = app.request("GET", "/users/me", Some(&session_id), None).await;
    assert_eq!(me.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_without_session_is_unauthorized() {
    let app = TestApp::spawn().await;

    let response = app.request("POST", "/auth/logout", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_forged_session_cookie_is_unauthenticated() {
    let app = TestApp::spawn().await;
    app.register("izzy@example.com", "correct-horse", "Izzy").await;

    let me = app
        .request("GET", "/users/me", Some("0000deadbeef"), None)
        .await;
    assert_eq!(me.status(), StatusCode::UNAUTHORIZED);
}
