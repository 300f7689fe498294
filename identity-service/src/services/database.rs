//! PostgreSQL record store.
//!
//! Implements [`IdentityStore`](crate::services::IdentityStore) with keyed
//! lookups and upserts; the two races the service cares about (reset-token
//! consumption, grant refresh) are single-statement conditional writes.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::models::{AccessGrant, Identity, Project, ResetToken};
use crate::services::{IdentityStore, ServiceError};

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database wrapper from a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl IdentityStore for Database {
    async fn health_check(&self) -> Result<(), ServiceError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_identity_by_id(
        &self,
        identity_id: Uuid,
    ) -> Result<Option<Identity>, ServiceError> {
        let identity =
            sqlx::query_as::<_, Identity>("SELECT * FROM identities WHERE identity_id = $1")
                .bind(identity_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(identity)
    }

    async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>, ServiceError> {
        let identity = sqlx::query_as::<_, Identity>(
            "SELECT * FROM identities WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(identity)
    }

    async fn find_identity_by_provider_id(
        &self,
        provider_id: &str,
    ) -> Result<Option<Identity>, ServiceError> {
        let identity =
            sqlx::query_as::<_, Identity>("SELECT * FROM identities WHERE provider_id = $1")
                .bind(provider_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(identity)
    }

    async fn find_identity_by_billing_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<Identity>, ServiceError> {
        let identity = sqlx::query_as::<_, Identity>(
            "SELECT * FROM identities WHERE billing_customer_id = $1",
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(identity)
    }

    async fn insert_identity(&self, identity: &Identity) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            INSERT INTO identities (identity_id, email, provider_id, password_hash, first_name, last_name, billing_customer_id, plan, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(identity.identity_id)
        .bind(&identity.email)
        .bind(&identity.provider_id)
        .bind(&identity.password_hash)
        .bind(&identity.first_name)
        .bind(&identity.last_name)
        .bind(&identity.billing_customer_id)
        .bind(&identity.plan)
        .bind(identity.created_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_identity_profile(
        &self,
        identity_id: Uuid,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<bool, ServiceError> {
        let result = sqlx::query(
            "UPDATE identities SET first_name = $2, last_name = $3 WHERE identity_id = $1",
        )
        .bind(identity_id)
        .bind(first_name)
        .bind(last_name)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn link_provider_id(
        &self,
        identity_id: Uuid,
        provider_id: &str,
    ) -> Result<(), ServiceError> {
        sqlx::query("UPDATE identities SET provider_id = $2 WHERE identity_id = $1")
            .bind(identity_id)
            .bind(provider_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_password_hash(
        &self,
        identity_id: Uuid,
        password_hash: &str,
    ) -> Result<bool, ServiceError> {
        let result = sqlx::query("UPDATE identities SET password_hash = $2 WHERE identity_id = $1")
            .bind(identity_id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_billing(
        &self,
        identity_id: Uuid,
        billing_customer_id: Option<&str>,
        plan: &str,
    ) -> Result<bool, ServiceError> {
        let result = sqlx::query(
            r#"
            UPDATE identities
            SET billing_customer_id = COALESCE($2, billing_customer_id), plan = $3
            WHERE identity_id = $1
            "#,
        )
        .bind(identity_id)
        .bind(billing_customer_id)
        .bind(plan)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_identity(&self, identity_id: Uuid) -> Result<bool, ServiceError> {
        // Reset tokens, projects and their grants go with the identity
        // through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM identities WHERE identity_id = $1")
            .bind(identity_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn upsert_reset_token(&self, token: &ResetToken) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            INSERT INTO reset_tokens (identity_id, token_digest, expires_at, consumed, created_utc)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (identity_id)
            DO UPDATE SET token_digest = EXCLUDED.token_digest,
                          expires_at = EXCLUDED.expires_at,
                          consumed = EXCLUDED.consumed,
                          created_utc = EXCLUDED.created_utc
            "#,
        )
        .bind(token.identity_id)
        .bind(&token.token_digest)
        .bind(token.expires_at)
        .bind(token.consumed)
        .bind(token.created_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        token_digest: &str,
    ) -> Result<Option<Uuid>, ServiceError> {
        // Compare-and-set on the consumed flag; exactly one concurrent
        // caller gets the row back.
        let row: Option<(Uuid,)> = sqlx::query_as(
            r#"
            UPDATE reset_tokens
            SET consumed = TRUE
            WHERE token_digest = $1 AND consumed = FALSE AND expires_at > NOW()
            RETURNING identity_id
            "#,
        )
        .bind(token_digest)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(identity_id,)| identity_id))
    }

    async fn upsert_access_grant(&self, grant: &AccessGrant) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            INSERT INTO access_grants (client_email, project_id, token, expires_at, created_utc)
            VALUES (LOWER($1), $2, $3, $4, $5)
            ON CONFLICT (client_email, project_id)
            DO UPDATE SET token = EXCLUDED.token,
                          expires_at = EXCLUDED.expires_at,
                          created_utc = EXCLUDED.created_utc
            "#,
        )
        .bind(&grant.client_email)
        .bind(grant.project_id)
        .bind(&grant.token)
        .bind(grant.expires_at)
        .bind(grant.created_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_access_grant(
        &self,
        client_email: &str,
        project_id: Uuid,
    ) -> Result<Option<AccessGrant>, ServiceError> {
        let grant = sqlx::query_as::<_, AccessGrant>(
            "SELECT * FROM access_grants WHERE client_email = LOWER($1) AND project_id = $2",
        )
        .bind(client_email)
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(grant)
    }

    async fn insert_project(&self, project: &Project) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            INSERT INTO projects (project_id, owner_id, name, created_utc)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(project.project_id)
        .bind(project.owner_id)
        .bind(&project.name)
        .bind(project.created_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_project_by_id(
        &self,
        project_id: Uuid,
    ) -> Result<Option<Project>, ServiceError> {
        let project = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE project_id = $1")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(project)
    }

    async fn list_projects_for_owner(
        &self,
        owner_id: Uuid,
    ) -> Result<Vec<Project>, ServiceError> {
        let projects = sqlx::query_as::<_, Project>(
            "SELECT * FROM projects WHERE owner_id = $1 ORDER BY created_utc",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(projects)
    }

    async fn update_project_name(
        &self,
        project_id: Uuid,
        name: &str,
    ) -> Result<bool, ServiceError> {
        let result = sqlx::query("UPDATE projects SET name = $2 WHERE project_id = $1")
            .bind(project_id)
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_project(&self, project_id: Uuid) -> Result<bool, ServiceError> {
        let result = sqlx::query("DELETE FROM projects WHERE project_id = $1")
            .bind(project_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
