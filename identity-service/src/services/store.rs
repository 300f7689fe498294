//! Record store interface.
//!
//! The relational store is an external collaborator; this trait pins down the
//! only query shapes the service depends on - keyed lookups, upserts, and two
//! atomic conditional writes (reset-token consumption and grant upsert).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::models::{AccessGrant, Identity, Project, ResetToken};
use crate::services::ServiceError;

#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn health_check(&self) -> Result<(), ServiceError>;

    async fn find_identity_by_id(&self, identity_id: Uuid)
        -> Result<Option<Identity>, ServiceError>;
    async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>, ServiceError>;
    async fn find_identity_by_provider_id(
        &self,
        provider_id: &str,
    ) -> Result<Option<Identity>, ServiceError>;
    async fn find_identity_by_billing_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<Identity>, ServiceError>;
    async fn insert_identity(&self, identity: &Identity) -> Result<(), ServiceError>;
    async fn update_identity_profile(
        &self,
        identity_id: Uuid,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<bool, ServiceError>;
    async fn link_provider_id(
        &self,
        identity_id: Uuid,
        provider_id: &str,
    ) -> Result<(), ServiceError>;
    async fn update_password_hash(
        &self,
        identity_id: Uuid,
        password_hash: &str,
    ) -> Result<bool, ServiceError>;
    async fn update_billing(
        &self,
        identity_id: Uuid,
        billing_customer_id: Option<&str>,
        plan: &str,
    ) -> Result<bool, ServiceError>;
    async fn delete_identity(&self, identity_id: Uuid) -> Result<bool, ServiceError>;

    /// Replace any prior reset token for the identity.
    async fn upsert_reset_token(&self, token: &ResetToken) -> Result<(), ServiceError>;
    /// Atomically claim a live reset token by digest. Exactly one of two
    /// concurrent callers with the same digest receives the identity id.
    async fn consume_reset_token(&self, token_digest: &str)
        -> Result<Option<Uuid>, ServiceError>;

    /// Upsert keyed on (client email, project id).
    async fn upsert_access_grant(&self, grant: &AccessGrant) -> Result<(), ServiceError>;
    async fn find_access_grant(
        &self,
        client_email: &str,
        project_id: Uuid,
    ) -> Result<Option<AccessGrant>, ServiceError>;

    async fn insert_project(&self, project: &Project) -> Result<(), ServiceError>;
    async fn find_project_by_id(&self, project_id: Uuid)
        -> Result<Option<Project>, ServiceError>;
    async fn list_projects_for_owner(&self, owner_id: Uuid)
        -> Result<Vec<Project>, ServiceError>;
    async fn update_project_name(&self, project_id: Uuid, name: &str)
        -> Result<bool, ServiceError>;
    async fn delete_project(&self, project_id: Uuid) -> Result<bool, ServiceError>;
}

/// In-memory record store used by tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    identities: HashMap<Uuid, Identity>,
    // keyed by identity so a fresh token supersedes the previous one
    reset_tokens: HashMap<Uuid, ResetToken>,
    grants: HashMap<(String, Uuid), AccessGrant>,
    projects: HashMap<Uuid, Project>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identity_count(&self) -> usize {
        self.lock().identities.len()
    }

    pub fn grant_count(&self) -> usize {
        self.lock().grants.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().expect("memory store mutex poisoned")
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn health_check(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn find_identity_by_id(
        &self,
        identity_id: Uuid,
    ) -> Result<Option<Identity>, ServiceError> {
        Ok(self.lock().identities.get(&identity_id).cloned())
    }

    async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>, ServiceError> {
        let needle = email.to_lowercase();
        Ok(self
            .lock()
            .identities
            .values()
            .find(|i| i.email.to_lowercase() == needle)
            .cloned())
    }

    async fn find_identity_by_provider_id(
        &self,
        provider_id: &str,
    ) -> Result<Option<Identity>, ServiceError> {
        Ok(self
            .lock()
            .identities
            .values()
            .find(|i| i.provider_id.as_deref() == Some(provider_id))
            .cloned())
    }

    async fn find_identity_by_billing_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<Identity>, ServiceError> {
        Ok(self
            .lock()
            .identities
            .values()
            .find(|i| i.billing_customer_id.as_deref() == Some(customer_id))
            .cloned())
    }

    async fn insert_identity(&self, identity: &Identity) -> Result<(), ServiceError> {
        self.lock()
            .identities
            .insert(identity.identity_id, identity.clone());
        Ok(())
    }

    async fn update_identity_profile(
        &self,
        identity_id: Uuid,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<bool, ServiceError> {
        let mut inner = self.lock();
        match inner.identities.get_mut(&identity_id) {
            Some(identity) => {
                identity.first_name = first_name.map(|s| s.to_string());
                identity.last_name = last_name.map(|s| s.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn link_provider_id(
        &self,
        identity_id: Uuid,
        provider_id: &str,
    ) -> Result<(), ServiceError> {
        let mut inner = self.lock();
        if let Some(identity) = inner.identities.get_mut(&identity_id) {
            identity.provider_id = Some(provider_id.to_string());
        }
        Ok(())
    }

    async fn update_password_hash(
        &self,
        identity_id: Uuid,
        password_hash: &str,
    ) -> Result<bool, ServiceError> {
        let mut inner = self.lock();
        match inner.identities.get_mut(&identity_id) {
            Some(identity) => {
                identity.password_hash = Some(password_hash.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_billing(
        &self,
        identity_id: Uuid,
        billing_customer_id: Option<&str>,
        plan: &str,
    ) -> Result<bool, ServiceError> {
        let mut inner = self.lock();
        match inner.identities.get_mut(&identity_id) {
            Some(identity) => {
                if let Some(customer) = billing_customer_id {
                    identity.billing_customer_id = Some(customer.to_string());
                }
                identity.plan = plan.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_identity(&self, identity_id: Uuid) -> Result<bool, ServiceError> {
        let mut inner = self.lock();
        inner.reset_tokens.remove(&identity_id);
        inner.projects.retain(|_, p| p.owner_id != identity_id);
        Ok(inner.identities.remove(&identity_id).is_some())
    }

    async fn upsert_reset_token(&self, token: &ResetToken) -> Result<(), ServiceError> {
        self.lock()
            .reset_tokens
            .insert(token.identity_id, token.clone());
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        token_digest: &str,
    ) -> Result<Option<Uuid>, ServiceError> {
        // Single lock held across match-and-mark; one concurrent caller wins.
        let mut inner = self.lock();
        for token in inner.reset_tokens.values_mut() {
            if token.token_digest == token_digest && !token.consumed && !token.is_expired() {
                token.consumed = true;
                return Ok(Some(token.identity_id));
            }
        }
        Ok(None)
    }

    async fn upsert_access_grant(&self, grant: &AccessGrant) -> Result<(), ServiceError> {
        self.lock().grants.insert(
            (grant.client_email.to_lowercase(), grant.project_id),
            grant.clone(),
        );
        Ok(())
    }

    async fn find_access_grant(
        &self,
        client_email: &str,
        project_id: Uuid,
    ) -> Result<Option<AccessGrant>, ServiceError> {
        Ok(self
            .lock()
            .grants
            .get(&(client_email.to_lowercase(), project_id))
            .cloned())
    }

    async fn insert_project(&self, project: &Project) -> Result<(), ServiceError> {
        self.lock()
            .projects
            .insert(project.project_id, project.clone());
        Ok(())
    }

    async fn find_project_by_id(
        &self,
        project_id: Uuid,
    ) -> Result<Option<Project>, ServiceError> {
        Ok(self.lock().projects.get(&project_id).cloned())
    }

    async fn list_projects_for_owner(
        &self,
        owner_id: Uuid,
    ) -> Result<Vec<Project>, ServiceError> {
        let mut projects: Vec<Project> = self
            .lock()
            .projects
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect();
        projects.sort_by_key(|p| p.created_utc);
        Ok(projects)
    }

    async fn update_project_name(
        &self,
        project_id: Uuid,
        name: &str,
    ) -> Result<bool, ServiceError> {
        let mut inner = self.lock();
        match inner.projects.get_mut(&project_id) {
            Some(project) => {
                project.name = name.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_project(&self, project_id: Uuid) -> Result<bool, ServiceError> {
        let mut inner = self.lock();
        inner
            .grants
            .retain(|(_, grant_project), _| *grant_project != project_id);
        Ok(inner.projects.remove(&project_id).is_some())
    }
}
