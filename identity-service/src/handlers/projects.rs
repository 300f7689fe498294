//! Project CRUD.
//!
//! Resource access follows a fixed order: existence is checked before
//! ownership, and both before any mutation. A missing project is `NotFound`
//! even for callers who would not own it; an existing project owned by
//! someone else is `Forbidden`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::{
    dtos::projects::{CreateProjectRequest, UpdateProjectRequest},
    middleware::CurrentIdentity,
    models::{Identity, Project, ProjectResponse},
    utils::ValidatedJson,
    AppState,
};

fn ensure_owner(project: &Project, identity: &Identity) -> Result<(), AppError> {
    if project.owner_id != identity.identity_id {
        return Err(AppError::Forbidden(anyhow::anyhow!("forbidden")));
    }
    Ok(())
}

async fn load_project(state: &AppState, project_id: Uuid) -> Result<Project, AppError> {
    state
        .store
        .find_project_by_id(project_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("not found")))
}

/// Create a project owned by the authenticated identity
#[utoipa::path(
    post,
    path = "/projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = ProjectResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Projects"
)]
pub async fn create_project(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    ValidatedJson(req): ValidatedJson<CreateProjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    let project = Project::new(identity.identity_id, req.name);
    state.store.insert_project(&project).await?;

    tracing::info!(project_id = %project.project_id, "Project created");

    Ok((StatusCode::CREATED, Json(ProjectResponse::from(project))))
}

/// List the authenticated identity's projects
#[utoipa::path(
    get,
    path = "/projects",
    responses(
        (status = 200, description = "Projects owned by the caller", body = [ProjectResponse]),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "Projects"
)]
pub async fn list_projects(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
) -> Result<impl IntoResponse, AppError> {
    let projects = state
        .store
        .list_projects_for_owner(identity.identity_id)
        .await?;
    let projects: Vec<ProjectResponse> = projects.into_iter().map(ProjectResponse::from).collect();
    Ok(Json(projects))
}

/// Get one of the authenticated identity's projects
#[utoipa::path(
    get,
    path = "/projects/{project_id}",
    params(("project_id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "The project", body = ProjectResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "No such project", body = ErrorResponse)
    ),
    tag = "Projects"
)]
pub async fn get_project(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let project = load_project(&state, project_id).await?;
    ensure_owner(&project, &identity)?;
    Ok(Json(ProjectResponse::from(project)))
}

/// Rename a project
#[utoipa::path(
    patch,
    path = "/projects/{project_id}",
    params(("project_id" = Uuid, Path, description = "Project id")),
    request_body = UpdateProjectRequest,
    responses(
        (status = 200, description = "Updated project", body = ProjectResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "No such project", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Projects"
)]
pub async fn update_project(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(project_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateProjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    let project = load_project(&state, project_id).await?;
    ensure_owner(&project, &identity)?;

    state
        .store
        .update_project_name(project_id, &req.name)
        .await?;

    let updated = load_project(&state, project_id).await?;
    Ok(Json(ProjectResponse::from(updated)))
}

/// Delete a project
#[utoipa::path(
    delete,
    path = "/projects/{project_id}",
    params(("project_id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 204, description = "Project deleted"),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "No such project", body = ErrorResponse)
    ),
    tag = "Projects"
)]
pub async fn delete_project(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let project = load_project(&state, project_id).await?;
    ensure_owner(&project, &identity)?;

    state.store.delete_project(project_id).await?;

    tracing::info!(project_id = %project_id, "Project deleted");

    Ok(StatusCode::NO_CONTENT)
}
