use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_extra::extract::cookie::CookieJar;
use service_core::error::AppError;

use crate::{
    dtos::auth::RegisterRequest,
    middleware::session_cookie,
    services::serialize_identity,
    utils::ValidatedJson,
    AppState,
};

/// Register a new identity with a local password and start a session
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Identity registered", body = IdentityResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(CookieJar, impl IntoResponse), AppError> {
    let identity = state
        .auth
        .register(req.email, req.password, req.name)
        .await?;

    let record = serialize_identity(&identity);
    let session_id = state
        .sessions
        .create(&record, state.config.session.ttl_seconds())
        .await?;
    let jar = jar.add(session_cookie(session_id, &state.config));

    Ok((jar, (StatusCode::CREATED, Json(identity.sanitized()))))
}
