//! Inbound billing webhook endpoint.
//!
//! The body is taken as a raw `String` so verification runs over exactly the
//! bytes the provider signed; parsing happens only after the signature
//! checks out.

use axum::{extract::State, http::HeaderMap, http::StatusCode};
use service_core::error::AppError;

use crate::{services::webhook::SIGNATURE_HEADER, AppState};

/// Receive and process a signed billing event
#[utoipa::path(
    post,
    path = "/webhooks/billing",
    responses(
        (status = 200, description = "Event accepted"),
        (status = 400, description = "Signature rejected", body = ErrorResponse),
        (status = 404, description = "Event references an unknown account", body = ErrorResponse)
    ),
    tag = "Webhooks"
)]
pub async fn billing_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<StatusCode, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Missing billing signature header");
            AppError::BadRequest(anyhow::anyhow!("invalid webhook signature"))
        })?;

    let event = state.webhooks.verify(&body, signature)?;

    tracing::info!(event_id = %event.id, kind = %event.kind, "Processing billing event");

    state.webhooks.process(event).await?;

    // Empty body on accept
    Ok(StatusCode::OK)
}
