use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Project entity. The minimal owned resource the ownership checks gate.
#[derive(Debug, Clone, FromRow)]
pub struct Project {
    pub project_id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub created_utc: DateTime<Utc>,
}

impl Project {
    pub fn new(owner_id: Uuid, name: String) -> Self {
        Self {
            project_id: Uuid::new_v4(),
            owner_id,
            name,
            created_utc: Utc::now(),
        }
    }
}

/// Project response for API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProjectResponse {
    pub project_id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub created_utc: DateTime<Utc>,
}

impl From<Project> for ProjectResponse {
    fn from(p: Project) -> Self {
        Self {
            project_id: p.project_id,
            owner_id: p.owner_id,
            name: p.name,
            created_utc: p.created_utc,
        }
    }
}
