use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use service_core::error::AppError;

use crate::{
    dtos::auth::LoginRequest,
    middleware::{session_cookie, SessionId},
    models::SESSION_COOKIE,
    services::{serialize_identity, Credentials},
    utils::ValidatedJson,
    AppState,
};

/// Login with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = IdentityResponse),
        (status = 401, description = "Incorrect email or password", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<(CookieJar, impl IntoResponse), AppError> {
    let identity = state
        .auth
        .attempt(&Credentials::Password {
            email: req.email,
            password: req.password,
        })
        .await?;

    let record = serialize_identity(&identity);
    let session_id = state
        .sessions
        .create(&record, state.config.session.ttl_seconds())
        .await?;
    let jar = jar.add(session_cookie(session_id, &state.config));

    tracing::info!(identity_id = %identity.identity_id, "Login successful");

    Ok((jar, (StatusCode::OK, Json(identity.sanitized()))))
}

/// Logout and destroy the session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logged out"),
        (status = 401, description = "No live session", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    session: SessionId,
) -> Result<(CookieJar, impl IntoResponse), AppError> {
    state.sessions.destroy(&session.0).await?;

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/").build());

    Ok((
        jar,
        (
            StatusCode::OK,
            Json(serde_json::json!({ "message": "Logged out" })),
        ),
    ))
}
