use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Request to create a project.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub name: String,
}

/// Request to rename a project.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub name: String,
}

/// Request to grant a client access to a project.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct GrantAccessRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
}

/// Response after granting client access. The token itself travels out of
/// band.
#[derive(Debug, Serialize, ToSchema)]
pub struct GrantAccessResponse {
    pub client_email: String,
    pub project_id: Uuid,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

/// Redeem a client access grant.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RedeemAccessRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    pub project_id: Uuid,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub token: String,
}
