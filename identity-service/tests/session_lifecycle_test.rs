mod common;

use axum::http::StatusCode;
use common::TestApp;

#[tokio::test]
async fn test_deleting_identity_invalidates_every_session() {
    let app = TestApp::spawn().await;
    let first = app.register("izzy@example.com", "correct-horse", "Izzy").await;
    let second = app.login("izzy@example.com", "correct-horse").await;

    let response = app.request("DELETE", "/users/me", Some(&first), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // The very next request on either session is unauthenticated
    for session in [&first, &second] {
        let me = app.request("GET", "/users/me", Some(session), None).await;
        assert_eq!(me.status(), StatusCode::UNAUTHORIZED);
    }

    assert_eq!(app.store.identity_count(), 0);
}

#[tokio::test]
async fn test_session_for_deleted_identity_is_destroyed_on_sight() {
    let app = TestApp::spawn().await;
    let session = app.register("izzy@example.com", "correct-horse", "Izzy").await;
    let identity = app
        .state
        .store
        .find_identity_by_email("izzy@example.com")
        .await
        .unwrap()
        .unwrap();

    // Delete the identity behind the session's back
    app.state
        .store
        .delete_identity(identity.identity_id)
        .await
        .unwrap();

    // The stale session is rejected and destroyed by the middleware
    let me = app.request("GET", "/users/me", Some(&session), None).await;
    assert_eq!(me.status(), StatusCode::UNAUTHORIZED);

    assert!(app
        .state
        .sessions
        .get(&session)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_profile_update_takes_effect_on_next_request() {
    let app = TestApp::spawn().await;
    let session = app.register("izzy@example.com", "correct-horse", "Izzy").await;

    let response = app
        .request(
            "PATCH",
            "/users/me",
            Some(&session),
            Some(serde_json::json!({ "name": "jasmine howard-vickers" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // The session stores only the identity id, so there is no stale copy
    let me = app.request("GET", "/users/me", Some(&session), None).await;
    let body = common::body_json(me).await;
    assert_eq!(body["first_name"], "Jasmine");
    assert_eq!(body["last_name"], "Howard-Vickers");
}
