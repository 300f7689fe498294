use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::{
    dtos::auth::{PasswordResetConfirm, PasswordResetRequest, PasswordResetResponse},
    utils::ValidatedJson,
    AppState,
};

/// Request a password reset token
#[utoipa::path(
    post,
    path = "/auth/password-reset/request",
    request_body = PasswordResetRequest,
    responses(
        (status = 200, description = "Request accepted", body = PasswordResetResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn request_password_reset(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<PasswordResetRequest>,
) -> Result<impl IntoResponse, AppError> {
    // The response is identical whether or not the email is registered
    if let Some(identity) = state.store.find_identity_by_email(&req.email).await? {
        let issued = state.tokens.issue_reset_token(identity.identity_id).await?;

        // Delivery failures must not change the response shape either
        if let Err(e) = state
            .email
            .send_password_reset(&req.email, &issued.raw_token, &state.config.base_url)
            .await
        {
            tracing::error!(error = %e, "Failed to deliver reset token");
        }
    }

    Ok((
        StatusCode::OK,
        Json(PasswordResetResponse {
            message: "If that email is registered, a reset link is on its way.".to_string(),
        }),
    ))
}

/// Consume a reset token and set a new password
#[utoipa::path(
    post,
    path = "/auth/password-reset/confirm",
    request_body = PasswordResetConfirm,
    responses(
        (status = 200, description = "Password updated", body = PasswordResetResponse),
        (status = 400, description = "Invalid or expired token", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<PasswordResetConfirm>,
) -> Result<impl IntoResponse, AppError> {
    state
        .tokens
        .consume_reset_token(&req.token, &req.new_password)
        .await?;

    Ok((
        StatusCode::OK,
        Json(PasswordResetResponse {
            message: "Password updated. Please log in with your new password.".to_string(),
        }),
    ))
}
