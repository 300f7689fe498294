mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_unauthenticated_project_access_rejected() {
    let app = TestApp::spawn().await;

    let response = app
        .request("POST", "/projects", None, Some(json!({ "name": "Kitchen" })))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.request("GET", "/projects", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_owner_can_read_and_mutate() {
    let app = TestApp::spawn().await;
    let session = app.register("owner@example.com", "correct-horse", "Owner").await;
    let project_id = app.create_project(&session, "Kitchen").await;

    let get = app
        .request(
            "GET",
            &format!("/projects/{}", project_id),
            Some(&session),
            None,
        )
        .await;
    assert_eq!(get.status(), StatusCode::OK);

    let patch = app
        .request(
            "PATCH",
            &format!("/projects/{}", project_id),
            Some(&session),
            Some(json!({ "name": "Kitchen Remodel" })),
        )
        .await;
    assert_eq!(patch.status(), StatusCode::OK);

    let delete = app
        .request(
            "DELETE",
            &format!("/projects/{}", project_id),
            Some(&session),
            None,
        )
        .await;
    assert_eq!(delete.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_mutating_anothers_resource_is_forbidden() {
    let app = TestApp::spawn().await;
    let owner = app.register("owner@example.com", "correct-horse", "Owner").await;
    let other = app.register("other@example.com", "correct-horse", "Other").await;
    let project_id = app.create_project(&owner, "Kitchen").await;

    let patch = app
        .request(
            "PATCH",
            &format!("/projects/{}", project_id),
            Some(&other),
            Some(json!({ "name": "Hijacked" })),
        )
        .await;
    assert_eq!(patch.status(), StatusCode::FORBIDDEN);

    let delete = app
        .request(
            "DELETE",
            &format!("/projects/{}", project_id),
            Some(&other),
            None,
        )
        .await;
    assert_eq!(delete.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_deleted_resource_is_not_found_never_forbidden() {
    let app = TestApp::spawn().await;
    let owner = app.register("owner@example.com", "correct-horse", "Owner").await;
    let other = app.register("other@example.com", "correct-horse", "Other").await;
    let project_id = app.create_project(&owner, "Kitchen").await;

    // Forbidden while the resource exists
    let before = app
        .request(
            "PATCH",
            &format!("/projects/{}", project_id),
            Some(&other),
            Some(json!({ "name": "Hijacked" })),
        )
        .await;
    assert_eq!(before.status(), StatusCode::FORBIDDEN);

    app.request(
        "DELETE",
        &format!("/projects/{}", project_id),
        Some(&owner),
        None,
    )
    .await;

    // Existence is checked before ownership: same request is now NotFound
    let after = app
        .request(
            "PATCH",
            &format!("/projects/{}", project_id),
            Some(&other),
            Some(json!({ "name": "Hijacked" })),
        )
        .await;
    assert_eq!(after.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_only_shows_own_projects() {
    let app = TestApp::spawn().await;
    let owner = app.register("owner@example.com", "correct-horse", "Owner").await;
    let other = app.register("other@example.com", "correct-horse", "Other").await;
    app.create_project(&owner, "Kitchen").await;
    app.create_project(&owner, "Bathroom").await;
    app.create_project(&other, "Garage").await;

    let response = app.request("GET", "/projects", Some(&owner), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body.as_array().map(|a| a.len()), Some(2));
}
