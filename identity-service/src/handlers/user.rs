use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use service_core::error::AppError;

use crate::{
    dtos::auth::UpdateProfileRequest,
    middleware::CurrentIdentity,
    models::SESSION_COOKIE,
    utils::{parse_display_name, ValidatedJson},
    AppState,
};

/// Get the authenticated identity's profile
#[utoipa::path(
    get,
    path = "/users/me",
    responses(
        (status = 200, description = "Current profile", body = IdentityResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "User"
)]
pub async fn get_me(CurrentIdentity(identity): CurrentIdentity) -> impl IntoResponse {
    Json(identity.sanitized())
}

/// Update the authenticated identity's profile
#[utoipa::path(
    patch,
    path = "/users/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = IdentityResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "User"
)]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(raw_name) = req.name {
        let name = parse_display_name(&raw_name);
        let (first_name, last_name) = match &name {
            Some(n) => (Some(n.first_name.as_str()), Some(n.last_name.as_str())),
            None => (None, None),
        };
        state
            .store
            .update_identity_profile(identity.identity_id, first_name, last_name)
            .await?;
    }

    let updated = state
        .store
        .find_identity_by_id(identity.identity_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("not found")))?;

    Ok(Json(updated.sanitized()))
}

/// Delete the authenticated identity and every session referencing it
#[utoipa::path(
    delete,
    path = "/users/me",
    responses(
        (status = 204, description = "Identity deleted"),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "User"
)]
pub async fn delete_me(
    State(state): State<AppState>,
    jar: CookieJar,
    CurrentIdentity(identity): CurrentIdentity,
) -> Result<(CookieJar, impl IntoResponse), AppError> {
    let deleted = state.store.delete_identity(identity.identity_id).await?;
    if !deleted {
        return Err(AppError::NotFound(anyhow::anyhow!("not found")));
    }

    // No session may outlive its identity
    state
        .sessions
        .destroy_all_for_identity(identity.identity_id)
        .await?;

    tracing::info!(identity_id = %identity.identity_id, "Identity deleted");

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/").build());
    Ok((jar, StatusCode::NO_CONTENT))
}
