//! Client access: granting and redeeming project-scoped access for
//! non-account clients.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use service_core::error::AppError;
use uuid::Uuid;

use crate::{
    dtos::projects::{GrantAccessRequest, GrantAccessResponse, RedeemAccessRequest},
    middleware::{session_cookie, CurrentIdentity, MaybeClientAccess, SessionId},
    models::{ProjectResponse, SessionRecord},
    utils::ValidatedJson,
    AppState,
};

/// Grant a client access to a project. Owner only; re-granting refreshes the
/// token and expiry for the same (email, project) pair
#[utoipa::path(
    post,
    path = "/projects/{project_id}/access",
    params(("project_id" = Uuid, Path, description = "Project id")),
    request_body = GrantAccessRequest,
    responses(
        (status = 201, description = "Access granted", body = GrantAccessResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "No such project", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Client Access"
)]
pub async fn grant_access(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(project_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<GrantAccessRequest>,
) -> Result<impl IntoResponse, AppError> {
    // Existence, then ownership, then the write
    let project = state
        .store
        .find_project_by_id(project_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("not found")))?;
    if project.owner_id != identity.identity_id {
        return Err(AppError::Forbidden(anyhow::anyhow!("forbidden")));
    }

    let grant = state.grants.grant(&req.email, project_id).await?;

    // The raw token travels out of band only
    if let Err(e) = state
        .email
        .send_client_access(
            &grant.client_email,
            project_id,
            &grant.token,
            &state.config.base_url,
        )
        .await
    {
        tracing::error!(error = %e, "Failed to deliver access grant");
    }

    Ok((
        StatusCode::CREATED,
        Json(GrantAccessResponse {
            client_email: grant.client_email,
            project_id,
            expires_at: grant.expires_at,
        }),
    ))
}

/// Redeem a client access grant, attaching project access to the caller's
/// session
#[utoipa::path(
    post,
    path = "/client/access/redeem",
    request_body = RedeemAccessRequest,
    responses(
        (status = 200, description = "Access redeemed", body = ProjectResponse),
        (status = 400, description = "Invalid or expired token", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Client Access"
)]
pub async fn redeem_access(
    State(state): State<AppState>,
    jar: CookieJar,
    session: Option<SessionId>,
    ValidatedJson(req): ValidatedJson<RedeemAccessRequest>,
) -> Result<(CookieJar, impl IntoResponse), AppError> {
    let access = state
        .grants
        .redeem(&req.email, req.project_id, &req.token)
        .await?;

    // Validity was checked at use time; the project must still exist
    let project = state
        .store
        .find_project_by_id(req.project_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("not found")))?;

    let jar = match session {
        Some(SessionId(session_id)) => {
            // Attach the context to the live session
            let mut record = state
                .sessions
                .get(&session_id)
                .await?
                .unwrap_or_default();
            record.client_access = Some(access);
            state.sessions.put(&session_id, &record).await?;
            jar
        }
        None => {
            // Clients without an account get a session of their own
            let record = SessionRecord::for_client(access);
            let session_id = state
                .sessions
                .create(&record, state.config.session.ttl_seconds())
                .await?;
            jar.add(session_cookie(session_id, &state.config))
        }
    };

    Ok((jar, Json(ProjectResponse::from(project))))
}

/// View a project through a redeemed client access context
#[utoipa::path(
    get,
    path = "/client/projects/{project_id}",
    params(("project_id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "The project", body = ProjectResponse),
        (status = 401, description = "No client access context", body = ErrorResponse),
        (status = 403, description = "Context is for another project", body = ErrorResponse),
        (status = 404, description = "No such project", body = ErrorResponse)
    ),
    tag = "Client Access"
)]
pub async fn get_client_project(
    State(state): State<AppState>,
    MaybeClientAccess(access): MaybeClientAccess,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    // Existence before the access decision, as everywhere else
    let project = state
        .store
        .find_project_by_id(project_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("not found")))?;

    let access =
        access.ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("authentication required")))?;
    if access.project_id != project_id {
        return Err(AppError::Forbidden(anyhow::anyhow!("forbidden")));
    }

    Ok(Json(ProjectResponse::from(project)))
}
